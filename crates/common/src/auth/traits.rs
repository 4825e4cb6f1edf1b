//! Traits for OAuth and session storage operations
//!
//! These traits enable dependency injection and testing by abstracting
//! external dependencies (OAuth servers, the browser's tab-scoped storage).

use async_trait::async_trait;
use authgate_domain::{AuthorizationServerDescriptor, ClientDescriptor};
use serde_json::{Map, Value};

use super::client::OAuthClientError;
use super::types::TokenResponse;

/// Trait for OAuth client operations
#[async_trait]
pub trait OAuthClientTrait: Send + Sync {
    /// Exchange authorization code for tokens
    ///
    /// # Arguments
    /// * `server` - Authorization server whose token endpoint is used
    /// * `client` - Client registration (id, redirect uri, optional secret)
    /// * `code` - Authorization code from the redirect callback
    /// * `code_verifier` - PKCE verifier stored when the flow started
    ///
    /// # Errors
    /// Returns error if the exchange fails or the response cannot be parsed
    async fn exchange_code(
        &self,
        server: &AuthorizationServerDescriptor,
        client: &ClientDescriptor,
        code: &str,
        code_verifier: &str,
    ) -> Result<TokenResponse, OAuthClientError>;

    /// Fetch the userinfo document with a bearer access token
    ///
    /// # Errors
    /// Returns error if the request fails or the body is not a JSON object
    async fn fetch_userinfo(
        &self,
        endpoint: &str,
        access_token: &str,
    ) -> Result<Map<String, Value>, OAuthClientError>;
}

/// Trait for tab-scoped key/value storage
///
/// Models the browser's per-tab session storage: string keys, string values,
/// gone when the tab closes.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    /// Read a value; `Ok(None)` when the key is absent
    ///
    /// # Errors
    /// Returns error if the backing store is unavailable
    async fn get(&self, key: &str) -> Result<Option<String>, String>;

    /// Write a value, replacing any previous one
    ///
    /// # Errors
    /// Returns error if the backing store is unavailable
    async fn set(&self, key: &str, value: &str) -> Result<(), String>;

    /// Remove a value; removing a missing key is not an error
    ///
    /// # Errors
    /// Returns error if the backing store is unavailable
    async fn remove(&self, key: &str) -> Result<(), String>;
}
