//! Mock implementations of auth traits
//!
//! Provides mock objects for testing purposes.

// Allow missing error/panic docs for test mocks - they are designed to be simple
// and errors are clearly indicated by their return types
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use authgate_domain::{AuthorizationServerDescriptor, ClientDescriptor};
use parking_lot::Mutex;
use serde_json::{Map, Value};

use crate::auth::{OAuthClientError, OAuthClientTrait, OAuthError, TokenResponse};

/// Arguments of the last `exchange_code` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeRecord {
    pub code: String,
    pub code_verifier: String,
    pub client_id: String,
    pub redirect_uri: String,
    pub sent_secret: bool,
}

#[derive(Debug, Default)]
struct MockState {
    token_response: Option<Result<TokenResponse, OAuthError>>,
    userinfo: Option<Map<String, Value>>,
    exchange_delay: Duration,
    last_exchange: Option<ExchangeRecord>,
    last_userinfo_token: Option<String>,
}

/// Scripted OAuth client
///
/// Returns whatever token/userinfo responses were configured and counts calls,
/// so tests can assert that an authorization code is exchanged at most once.
#[derive(Debug, Clone, Default)]
pub struct MockOAuthClient {
    state: Arc<Mutex<MockState>>,
    exchange_calls: Arc<AtomicUsize>,
    userinfo_calls: Arc<AtomicUsize>,
}

impl MockOAuthClient {
    /// Create a new mock OAuth client with nothing scripted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure a successful token response.
    pub fn set_token_response(&self, response: TokenResponse) {
        self.state.lock().token_response = Some(Ok(response));
    }

    /// Configure the token endpoint to answer with an OAuth error.
    pub fn set_token_error(&self, error: &str, description: Option<&str>) {
        self.state.lock().token_response = Some(Err(OAuthError {
            error: error.to_string(),
            error_description: description.map(str::to_string),
        }));
    }

    /// Configure the userinfo document.
    pub fn set_userinfo(&self, userinfo: Value) {
        self.state.lock().userinfo = match userinfo {
            Value::Object(map) => Some(map),
            _ => None,
        };
    }

    /// Delay each exchange, widening the window for concurrent callers.
    pub fn set_exchange_delay(&self, delay: Duration) {
        self.state.lock().exchange_delay = delay;
    }

    pub fn exchange_calls(&self) -> usize {
        self.exchange_calls.load(Ordering::SeqCst)
    }

    pub fn userinfo_calls(&self) -> usize {
        self.userinfo_calls.load(Ordering::SeqCst)
    }

    pub fn last_exchange(&self) -> Option<ExchangeRecord> {
        self.state.lock().last_exchange.clone()
    }

    pub fn last_userinfo_token(&self) -> Option<String> {
        self.state.lock().last_userinfo_token.clone()
    }
}

#[async_trait]
impl OAuthClientTrait for MockOAuthClient {
    async fn exchange_code(
        &self,
        _server: &AuthorizationServerDescriptor,
        client: &ClientDescriptor,
        code: &str,
        code_verifier: &str,
    ) -> Result<TokenResponse, OAuthClientError> {
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);

        let (delay, scripted) = {
            let mut state = self.state.lock();
            state.last_exchange = Some(ExchangeRecord {
                code: code.to_string(),
                code_verifier: code_verifier.to_string(),
                client_id: client.client_id.clone(),
                redirect_uri: client.redirect_uri.clone(),
                sent_secret: client.client_secret.is_some(),
            });
            (state.exchange_delay, state.token_response.clone())
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        match scripted {
            Some(Ok(response)) => Ok(response),
            Some(Err(error)) => Err(OAuthClientError::OAuthError(error)),
            None => Err(OAuthClientError::ConfigError("no token response scripted".into())),
        }
    }

    async fn fetch_userinfo(
        &self,
        _endpoint: &str,
        access_token: &str,
    ) -> Result<Map<String, Value>, OAuthClientError> {
        self.userinfo_calls.fetch_add(1, Ordering::SeqCst);

        let mut state = self.state.lock();
        state.last_userinfo_token = Some(access_token.to_string());
        state.userinfo.clone().ok_or_else(|| OAuthClientError::HttpStatus {
            status: 401,
            body: "no userinfo scripted".into(),
        })
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for testing::mocks.
    use serde_json::json;

    use super::*;

    fn descriptors() -> (AuthorizationServerDescriptor, ClientDescriptor) {
        (
            AuthorizationServerDescriptor {
                issuer: "https://idp.test".into(),
                authorization_endpoint: "https://idp.test/auth".into(),
                token_endpoint: "https://idp.test/token".into(),
                jwks_uri: "https://idp.test/jwks".into(),
                userinfo_endpoint: Some("https://idp.test/userinfo".into()),
                end_session_endpoint: None,
                supported_pkce_methods: std::collections::BTreeSet::new(),
            },
            ClientDescriptor {
                client_id: "ui".into(),
                scope: "openid".into(),
                redirect_uri: "https://app.test/oauth/callback".into(),
                protocol_kind: authgate_domain::ProtocolKind::OAuth,
                client_secret: None,
                post_logout_redirect_uri: None,
            },
        )
    }

    #[tokio::test]
    async fn records_exchange_and_counts_calls() {
        let mock = MockOAuthClient::new();
        mock.set_token_response(TokenResponse::bearer("tok"));
        let (server, client) = descriptors();

        let response = mock.exchange_code(&server, &client, "code-1", "verifier").await.unwrap();
        assert_eq!(response.access_token, "tok");
        assert_eq!(mock.exchange_calls(), 1);

        let record = mock.last_exchange().unwrap();
        assert_eq!(record.code, "code-1");
        assert!(!record.sent_secret);
    }

    #[tokio::test]
    async fn unscripted_userinfo_fails() {
        let mock = MockOAuthClient::new();
        assert!(mock.fetch_userinfo("https://idp.test/userinfo", "tok").await.is_err());

        mock.set_userinfo(json!({"sub": "u-1"}));
        let info = mock.fetch_userinfo("https://idp.test/userinfo", "tok").await.unwrap();
        assert_eq!(info["sub"], "u-1");
        assert_eq!(mock.userinfo_calls(), 2);
    }
}
