//! Provider configuration resolution
//!
//! Turns the registry's description of the active ("core") provider into the
//! immutable [`AuthorizationServerDescriptor`] / [`ClientDescriptor`] pair the
//! rest of the engine works with.

use std::collections::BTreeSet;
use std::sync::Arc;

use authgate_common::auth::{ProviderDescriptor, ProviderRegistrySnapshot};
use authgate_domain::{
    AuthError, AuthorizationServerDescriptor, ClientDescriptor, ConfigStatus, EngineConfig,
    ProtocolKind, Resolution, ResolvedConfig, Result,
};
use parking_lot::RwLock;
use tracing::{debug, info, warn};
use url::Url;

use super::guard::SingleFlight;
use super::ports::ProviderRegistry;

/// Scope requested from OIDC providers that do not configure one
pub const DEFAULT_OIDC_SCOPE: &str = "openid profile email";

/// Scope requested from plain OAuth providers that do not configure one
pub const DEFAULT_OAUTH_SCOPE: &str = "profile email";

/// Resolves and caches the active provider configuration
///
/// Every call to [`resolve`](Self::resolve) asks the registry again, so a
/// change of core provider is picked up; concurrent calls share one registry
/// round-trip.
pub struct ProviderConfigResolver {
    registry: Arc<dyn ProviderRegistry>,
    origin: String,
    callback_path: String,
    post_logout_redirect: Option<String>,
    current: Arc<RwLock<Option<Resolution>>>,
    flight: SingleFlight<Result<Resolution>>,
}

impl ProviderConfigResolver {
    /// Create a resolver for the given registry and engine settings.
    pub fn new(registry: Arc<dyn ProviderRegistry>, config: &EngineConfig) -> Self {
        Self {
            registry,
            origin: config.origin.clone(),
            callback_path: config.callback_path.clone(),
            post_logout_redirect: config.post_logout_redirect.clone(),
            current: Arc::new(RwLock::new(None)),
            flight: SingleFlight::new(),
        }
    }

    /// Fetch the registry and resolve the core provider.
    ///
    /// A call made while another is outstanding waits for and returns the
    /// same outcome instead of issuing a second registry request.
    ///
    /// # Errors
    /// Returns `AuthError::Config` for a missing or malformed core provider
    /// descriptor, or the registry's own error if it cannot be reached.
    pub async fn resolve(&self) -> Result<Resolution> {
        let registry = Arc::clone(&self.registry);
        let current = Arc::clone(&self.current);
        let origin = self.origin.clone();
        let callback_path = self.callback_path.clone();
        let post_logout_redirect = self.post_logout_redirect.clone();

        let (outcome, joined) = self
            .flight
            .run(move || async move {
                let snapshot = registry.snapshot().await?;
                let mut resolution = build_resolution(&snapshot, &origin, &callback_path)?;

                if let (Resolution::Ready(config), Some(target)) =
                    (&mut resolution, post_logout_redirect)
                {
                    if config.client.post_logout_redirect_uri.is_none() {
                        Arc::make_mut(config).client.post_logout_redirect_uri = Some(target);
                    }
                }

                *current.write() = Some(resolution.clone());
                Ok(resolution)
            })
            .await;

        if joined {
            debug!("joined in-flight provider resolution");
        }
        outcome
    }

    /// Whether a resolution is outstanding.
    pub fn is_resolving(&self) -> bool {
        self.flight.is_running()
    }

    /// Last successful resolution, if any.
    pub fn current(&self) -> Option<Resolution> {
        self.current.read().clone()
    }

    /// Resolved configuration, when the last resolution produced one.
    pub fn ready_config(&self) -> Option<Arc<ResolvedConfig>> {
        self.current.read().as_ref().and_then(Resolution::config).cloned()
    }

    /// Lifecycle of the provider configuration.
    pub fn status(&self) -> ConfigStatus {
        if self.is_resolving() {
            return ConfigStatus::Resolving;
        }
        match self.current.read().as_ref() {
            None => ConfigStatus::Uninitialized,
            Some(Resolution::SystemNotReady) => ConfigStatus::SystemNotReady,
            Some(Resolution::Ready(_)) => ConfigStatus::Ready,
        }
    }
}

/// Build the resolution for a registry snapshot.
///
/// `origin` and `callback_path` supply the redirect URI when the provider
/// does not configure one.
///
/// # Errors
/// Returns `AuthError::Config` when the core provider is unset while other
/// providers exist, is not registered, or lacks a required field.
pub fn build_resolution(
    snapshot: &ProviderRegistrySnapshot,
    origin: &str,
    callback_path: &str,
) -> Result<Resolution> {
    if snapshot.is_unconfigured() {
        info!("no identity provider configured; authentication not required yet");
        return Ok(Resolution::SystemNotReady);
    }

    let provider_id = snapshot
        .core
        .as_deref()
        .ok_or_else(|| AuthError::Config("no core provider selected".to_string()))?;
    let provider = snapshot.providers.get(provider_id).ok_or_else(|| {
        AuthError::Config(format!("core provider '{provider_id}' is not registered"))
    })?;

    let protocol_kind = protocol_kind(provider_id, provider)?;
    let server = server_descriptor(provider_id, provider)?;
    let client = client_descriptor(provider_id, provider, protocol_kind, origin, callback_path)?;

    if protocol_kind == ProtocolKind::OAuth && server.userinfo_endpoint.is_none() {
        warn!(provider = provider_id, "oauth provider has no userinfo endpoint");
    }

    info!(
        provider = provider_id,
        protocol = %protocol_kind,
        issuer = %server.issuer,
        s256 = server.supports_s256(),
        "resolved provider configuration"
    );

    Ok(Resolution::Ready(Arc::new(ResolvedConfig {
        provider_id: provider_id.to_string(),
        server,
        client,
    })))
}

fn protocol_kind(provider_id: &str, provider: &ProviderDescriptor) -> Result<ProtocolKind> {
    let kind = provider
        .kind
        .as_deref()
        .map(str::trim)
        .filter(|kind| !kind.is_empty())
        .ok_or_else(|| AuthError::Config(format!("provider '{provider_id}' is missing kind")))?;

    match kind.to_ascii_lowercase().as_str() {
        "oidc" => Ok(ProtocolKind::Oidc),
        "oauth" | "oauth2" => Ok(ProtocolKind::OAuth),
        other => {
            Err(AuthError::Config(format!("provider '{provider_id}' has unknown kind '{other}'")))
        }
    }
}

fn server_descriptor(
    provider_id: &str,
    provider: &ProviderDescriptor,
) -> Result<AuthorizationServerDescriptor> {
    let properties = &provider.properties;

    Ok(AuthorizationServerDescriptor {
        issuer: required_url(provider_id, "issuer_url", provider.issuer_url.as_deref())?,
        authorization_endpoint: required_url(
            provider_id,
            "authorize_url",
            provider.authorize_url.as_deref(),
        )?,
        token_endpoint: required_url(provider_id, "token_url", provider.token_url.as_deref())?,
        jwks_uri: required_url(provider_id, "jwk_url", provider.jwk_url.as_deref())?,
        userinfo_endpoint: optional_url(
            provider_id,
            "userinfo_url",
            properties.userinfo_url.as_deref(),
        )?,
        end_session_endpoint: optional_url(
            provider_id,
            "end_session_url",
            properties.end_session_url.as_deref(),
        )?,
        supported_pkce_methods: properties
            .code_challenge_methods_supported
            .iter()
            .map(|method| method.trim().to_string())
            .collect::<BTreeSet<_>>(),
    })
}

fn client_descriptor(
    provider_id: &str,
    provider: &ProviderDescriptor,
    protocol_kind: ProtocolKind,
    origin: &str,
    callback_path: &str,
) -> Result<ClientDescriptor> {
    let properties = &provider.properties;

    let client_id = non_empty(properties.client_id.as_deref())
        .ok_or_else(|| {
            AuthError::Config(format!("provider '{provider_id}' is missing client_id"))
        })?
        .to_string();

    let scope = non_empty(properties.scope.as_deref()).map_or_else(
        || match protocol_kind {
            ProtocolKind::Oidc => DEFAULT_OIDC_SCOPE.to_string(),
            ProtocolKind::OAuth => DEFAULT_OAUTH_SCOPE.to_string(),
        },
        str::to_string,
    );

    let redirect_uri = match optional_url(
        provider_id,
        "redirect_uri",
        properties.redirect_uri.as_deref(),
    )? {
        Some(uri) => uri,
        None => format!("{}{}", origin.trim_end_matches('/'), callback_path),
    };

    Ok(ClientDescriptor {
        client_id,
        scope,
        redirect_uri,
        protocol_kind,
        client_secret: non_empty(properties.client_secret.as_deref()).map(str::to_string),
        post_logout_redirect_uri: non_empty(properties.post_logout_redirect_uri.as_deref())
            .map(str::to_string),
    })
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn required_url(provider_id: &str, field: &str, value: Option<&str>) -> Result<String> {
    optional_url(provider_id, field, value)?
        .ok_or_else(|| AuthError::Config(format!("provider '{provider_id}' is missing {field}")))
}

fn optional_url(provider_id: &str, field: &str, value: Option<&str>) -> Result<Option<String>> {
    let Some(value) = non_empty(value) else {
        return Ok(None);
    };
    Url::parse(value).map_err(|e| {
        AuthError::Config(format!("provider '{provider_id}' has invalid {field} '{value}': {e}"))
    })?;
    Ok(Some(value.to_string()))
}
