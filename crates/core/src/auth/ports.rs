//! Port interfaces for the authentication engine
//!
//! These traits define the boundaries between the engine and the outside
//! world: the provider registry service, the issuer's published key set, the
//! browser location, and the onboarding state of the device.

use async_trait::async_trait;
use authgate_common::auth::ProviderRegistrySnapshot;
use authgate_domain::Result;
use url::Url;

/// Read-only access to the device's provider registry
#[async_trait]
pub trait ProviderRegistry: Send + Sync {
    /// Fetch the configured providers and the id of the active one
    async fn snapshot(&self) -> Result<ProviderRegistrySnapshot>;
}

/// Minimal key-fetch capability of the active provider
#[async_trait]
pub trait SigningKeySource: Send + Sync {
    /// Key id of the provider's current signing key
    ///
    /// `Ok(None)` when the provider publishes no key id.
    async fn current_key_id(&self) -> Result<Option<String>>;
}

/// Current navigable location
pub trait Navigator: Send + Sync {
    /// Full current location, including query string
    fn location(&self) -> String;

    /// Navigate away to `url`
    fn assign(&self, url: &Url);

    /// Overwrite the current location without navigating
    fn replace(&self, location: &str);
}

/// Device onboarding state
pub trait ReadinessSignal: Send + Sync {
    /// Whether the device finished onboarding; the gate is inactive until then
    fn is_onboarded(&self) -> bool;
}

/// Readiness signal for devices that are always onboarded
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysOnboarded;

impl ReadinessSignal for AlwaysOnboarded {
    fn is_onboarded(&self) -> bool {
        true
    }
}
