//! Engine assembly
//!
//! Connects the HTTP adapters to an [`AuthEngineBuilder`]. Callers still
//! provide the navigator and may override storage, readiness or the OAuth
//! client before building.

use std::sync::Arc;
use std::time::Duration;

use authgate_common::auth::OAuthClient;
use authgate_core::{AuthEngine, AuthEngineBuilder, Navigator, ProviderRegistry};
use authgate_domain::{EngineConfig, Result};

use crate::http::HttpClient;
use crate::jwks::HttpSigningKeySource;
use crate::registry::HttpProviderRegistry;

/// Builder preloaded with the HTTP registry, JWKS source and OAuth client,
/// all sharing one connection pool and the configured timeout.
///
/// # Errors
/// Returns `AuthError::Config` if the HTTP client cannot be built.
pub fn engine_builder(config: EngineConfig, navigator: Arc<dyn Navigator>) -> Result<AuthEngineBuilder> {
    let http = HttpClient::builder().timeout(Duration::from_secs(config.http_timeout_secs)).build()?;

    let registry: Arc<dyn ProviderRegistry> =
        Arc::new(HttpProviderRegistry::new(http.clone(), config.registry_url.clone()));
    let keys = HttpSigningKeySource::from_registry(http.clone(), Arc::clone(&registry));
    let oauth = OAuthClient::with_client(http.inner().clone());

    Ok(AuthEngine::builder(config)
        .registry(registry)
        .signing_keys(Arc::new(keys))
        .oauth_client(Arc::new(oauth))
        .navigator(navigator))
}
