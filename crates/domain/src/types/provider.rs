//! Resolved provider configuration
//!
//! Immutable value objects built from the provider registry. A new pair is
//! produced whenever the active provider changes; nothing mutates them in
//! place.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// PKCE challenge method this engine generates.
pub const PKCE_METHOD_S256: &str = "S256";

/// Protocol variant declared by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolKind {
    /// OpenID Connect: identity comes from the ID token
    Oidc,
    /// Plain OAuth 2.0: identity comes from a userinfo lookup
    OAuth,
}

impl ProtocolKind {
    /// Whether the token response must carry an ID token.
    #[must_use]
    pub const fn requires_id_token(self) -> bool {
        matches!(self, Self::Oidc)
    }
}

impl fmt::Display for ProtocolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Oidc => write!(f, "oidc"),
            Self::OAuth => write!(f, "oauth"),
        }
    }
}

/// Authorization server endpoints and capabilities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationServerDescriptor {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub jwks_uri: String,
    pub userinfo_endpoint: Option<String>,
    pub end_session_endpoint: Option<String>,
    /// Advertised `code_challenge_methods_supported`
    pub supported_pkce_methods: BTreeSet<String>,
}

impl AuthorizationServerDescriptor {
    /// Whether the server advertises S256 PKCE support.
    #[must_use]
    pub fn supports_s256(&self) -> bool {
        self.supported_pkce_methods.contains(PKCE_METHOD_S256)
    }
}

/// Client registration used against the authorization server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientDescriptor {
    pub client_id: String,
    pub scope: String,
    pub redirect_uri: String,
    pub protocol_kind: ProtocolKind,
    /// Present only for confidential clients (sent as `client_secret_post`)
    #[serde(skip_serializing)]
    pub client_secret: Option<String>,
    /// Target passed to the end-session endpoint on sign-out
    pub post_logout_redirect_uri: Option<String>,
}

/// Descriptor pair for the active ("core") provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub provider_id: String,
    pub server: AuthorizationServerDescriptor,
    pub client: ClientDescriptor,
}

/// Outcome of resolving the provider configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A core provider is configured and valid
    Ready(Arc<ResolvedConfig>),
    /// No core provider and no providers at all: authentication is optional
    /// for now (first-run onboarding)
    SystemNotReady,
}

impl Resolution {
    /// The resolved configuration, if any.
    #[must_use]
    pub fn config(&self) -> Option<&Arc<ResolvedConfig>> {
        match self {
            Self::Ready(config) => Some(config),
            Self::SystemNotReady => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_kind_uses_registry_spelling() {
        let oidc: ProtocolKind = serde_json::from_str("\"oidc\"").unwrap();
        let oauth: ProtocolKind = serde_json::from_str("\"oauth\"").unwrap();
        assert_eq!(oidc, ProtocolKind::Oidc);
        assert_eq!(oauth, ProtocolKind::OAuth);
        assert!(oidc.requires_id_token());
        assert!(!oauth.requires_id_token());
    }

    #[test]
    fn s256_support_follows_advertised_methods() {
        let mut server = AuthorizationServerDescriptor {
            issuer: "https://idp.example.com".into(),
            authorization_endpoint: "https://idp.example.com/authorize".into(),
            token_endpoint: "https://idp.example.com/token".into(),
            jwks_uri: "https://idp.example.com/jwks".into(),
            userinfo_endpoint: None,
            end_session_endpoint: None,
            supported_pkce_methods: BTreeSet::new(),
        };
        assert!(!server.supports_s256());

        server.supported_pkce_methods.insert("S256".into());
        assert!(server.supports_s256());
    }
}
