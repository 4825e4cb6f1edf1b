//! OAuth 2.0 client implementation
//!
//! Handles the back-channel half of the Authorization Code flow:
//! - Authorization code exchange (with PKCE verifier)
//! - Userinfo lookup for plain OAuth providers

use std::time::Duration;

use async_trait::async_trait;
use authgate_domain::{AuthorizationServerDescriptor, ClientDescriptor};
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde_json::{Map, Value};
use tracing::debug;

use super::traits::OAuthClientTrait;
use super::types::{OAuthError, TokenResponse};

/// Error type for OAuth client operations
#[derive(Debug)]
pub enum OAuthClientError {
    /// HTTP request failed
    RequestFailed(reqwest::Error),

    /// OAuth server returned an error body
    OAuthError(OAuthError),

    /// Non-success status without a parseable OAuth error body
    HttpStatus { status: u16, body: String },

    /// Failed to parse response
    ParseError(String),

    /// Endpoint needed for the operation is not configured
    ConfigError(String),
}

impl std::fmt::Display for OAuthClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RequestFailed(e) => write!(f, "HTTP request failed: {e}"),
            Self::OAuthError(e) => write!(f, "OAuth error: {e}"),
            Self::HttpStatus { status, body } => write!(f, "HTTP {status}: {body}"),
            Self::ParseError(msg) => write!(f, "Parse error: {msg}"),
            Self::ConfigError(msg) => write!(f, "Configuration error: {msg}"),
        }
    }
}

impl std::error::Error for OAuthClientError {}

impl From<reqwest::Error> for OAuthClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::RequestFailed(err)
    }
}

/// OAuth 2.0 client
///
/// Implements the token request of RFC 6749 §4.1.3 with the RFC 7636
/// `code_verifier`, and the OIDC userinfo request. Confidential clients
/// authenticate with `client_secret_post`; public clients send only their
/// `client_id`.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    client: Client,
}

impl OAuthClient {
    /// Create a client whose requests time out after `timeout`.
    ///
    /// # Errors
    /// Returns `OAuthClientError::ConfigError` if the HTTP client cannot be
    /// built (for example when no TLS backend can be initialized).
    pub fn new(timeout: Duration) -> Result<Self, OAuthClientError> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            OAuthClientError::ConfigError(format!("failed to build OAuth HTTP client: {e}"))
        })?;
        Ok(Self { client })
    }

    /// Wrap an already configured reqwest client.
    #[must_use]
    pub const fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Exchange authorization code for tokens
    ///
    /// # Errors
    /// Returns error if:
    /// - The request cannot be sent
    /// - The token endpoint answers with an error
    /// - Response parsing fails
    pub async fn exchange_code(
        &self,
        server: &AuthorizationServerDescriptor,
        client: &ClientDescriptor,
        code: &str,
        code_verifier: &str,
    ) -> Result<TokenResponse, OAuthClientError> {
        let mut request_body = vec![
            ("grant_type", "authorization_code"),
            ("client_id", client.client_id.as_str()),
            ("code", code),
            ("redirect_uri", client.redirect_uri.as_str()),
            ("code_verifier", code_verifier),
        ];

        if let Some(secret) = client.client_secret.as_deref() {
            request_body.push(("client_secret", secret));
        }

        debug!(token_endpoint = %server.token_endpoint, "exchanging authorization code");

        let response = self
            .client
            .post(&server.token_endpoint)
            .header(ACCEPT, "application/json")
            .form(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        response.json().await.map_err(|e| OAuthClientError::ParseError(e.to_string()))
    }

    /// Fetch the userinfo document for `access_token`.
    ///
    /// # Errors
    /// Returns error if the request fails, the endpoint rejects the token, or
    /// the body is not a JSON object.
    pub async fn fetch_userinfo(
        &self,
        endpoint: &str,
        access_token: &str,
    ) -> Result<Map<String, Value>, OAuthClientError> {
        debug!(userinfo_endpoint = %endpoint, "fetching userinfo");

        let response = self
            .client
            .get(endpoint)
            .bearer_auth(access_token)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        response.json().await.map_err(|e| OAuthClientError::ParseError(e.to_string()))
    }
}

async fn error_from_response(response: reqwest::Response) -> OAuthClientError {
    let status = response.status().as_u16();
    match response.text().await {
        Ok(body) => match serde_json::from_str::<OAuthError>(&body) {
            Ok(error) => OAuthClientError::OAuthError(error),
            Err(_) => OAuthClientError::HttpStatus { status, body },
        },
        Err(e) => OAuthClientError::RequestFailed(e),
    }
}

#[async_trait]
impl OAuthClientTrait for OAuthClient {
    async fn exchange_code(
        &self,
        server: &AuthorizationServerDescriptor,
        client: &ClientDescriptor,
        code: &str,
        code_verifier: &str,
    ) -> Result<TokenResponse, OAuthClientError> {
        self.exchange_code(server, client, code, code_verifier).await
    }

    async fn fetch_userinfo(
        &self,
        endpoint: &str,
        access_token: &str,
    ) -> Result<Map<String, Value>, OAuthClientError> {
        self.fetch_userinfo(endpoint, access_token).await
    }
}
