//! Provider registry adapter
//!
//! Reads the device's identity provider registry over HTTP.

use async_trait::async_trait;
use authgate_common::auth::ProviderRegistrySnapshot;
use authgate_core::ProviderRegistry;
use authgate_domain::Result;
use tracing::debug;

use crate::http::HttpClient;

/// [`ProviderRegistry`] backed by `GET {base_url}/providers`
#[derive(Debug, Clone)]
pub struct HttpProviderRegistry {
    http: HttpClient,
    base_url: String,
}

impl HttpProviderRegistry {
    pub fn new(http: HttpClient, base_url: impl Into<String>) -> Self {
        Self { http, base_url: base_url.into() }
    }

    fn providers_url(&self) -> String {
        format!("{}/providers", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ProviderRegistry for HttpProviderRegistry {
    async fn snapshot(&self) -> Result<ProviderRegistrySnapshot> {
        let snapshot: ProviderRegistrySnapshot = self.http.get_json(&self.providers_url()).await?;
        debug!(
            core = snapshot.core.as_deref().unwrap_or("<none>"),
            providers = snapshot.providers.len(),
            "fetched provider registry"
        );
        Ok(snapshot)
    }
}
