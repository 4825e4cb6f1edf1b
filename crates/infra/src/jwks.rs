//! Signing key adapter
//!
//! Fetches the issuer's published key set and reports the current signing
//! key id, which the session store compares with the `kid` of a persisted
//! token.

use std::sync::Arc;

use async_trait::async_trait;
use authgate_common::auth::JwkSet;
use authgate_core::{ProviderRegistry, SigningKeySource};
use authgate_domain::Result;
use tracing::debug;

use crate::http::HttpClient;

/// Where the JWKS URL comes from
#[derive(Clone)]
enum JwksLocation {
    /// The active provider's `jwk_url` in the registry, looked up per call
    Registry(Arc<dyn ProviderRegistry>),
    Fixed(String),
}

/// [`SigningKeySource`] backed by an HTTP JWKS endpoint
#[derive(Clone)]
pub struct HttpSigningKeySource {
    http: HttpClient,
    location: JwksLocation,
}

impl HttpSigningKeySource {
    /// Follow the active provider in `registry`.
    pub fn from_registry(http: HttpClient, registry: Arc<dyn ProviderRegistry>) -> Self {
        Self { http, location: JwksLocation::Registry(registry) }
    }

    /// Always read the key set at `jwks_uri`.
    pub fn fixed(http: HttpClient, jwks_uri: impl Into<String>) -> Self {
        Self { http, location: JwksLocation::Fixed(jwks_uri.into()) }
    }

    async fn jwks_uri(&self) -> Result<Option<String>> {
        match &self.location {
            JwksLocation::Fixed(uri) => Ok(Some(uri.clone())),
            JwksLocation::Registry(registry) => {
                let snapshot = registry.snapshot().await?;
                Ok(snapshot
                    .core
                    .as_ref()
                    .and_then(|core| snapshot.providers.get(core))
                    .and_then(|provider| provider.jwk_url.clone()))
            }
        }
    }
}

impl std::fmt::Debug for HttpSigningKeySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let location = match &self.location {
            JwksLocation::Registry(_) => "registry",
            JwksLocation::Fixed(uri) => uri.as_str(),
        };
        f.debug_struct("HttpSigningKeySource").field("location", &location).finish()
    }
}

#[async_trait]
impl SigningKeySource for HttpSigningKeySource {
    async fn current_key_id(&self) -> Result<Option<String>> {
        let Some(uri) = self.jwks_uri().await? else {
            debug!("no active provider JWKS URL");
            return Ok(None);
        };

        let jwks: JwkSet = self.http.get_json(&uri).await?;
        let kid = jwks.current_signing_kid().map(str::to_string);
        debug!(jwks_uri = %uri, keys = jwks.keys.len(), kid = ?kid, "fetched signing keys");
        Ok(kid)
    }
}
