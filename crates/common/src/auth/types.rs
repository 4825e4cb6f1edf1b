//! OAuth 2.0 wire types
//!
//! Shapes exchanged with the provider registry, the token endpoint and the
//! JWKS endpoint. Registry descriptor fields are all optional on the wire so
//! that a missing field surfaces as a configuration error from the resolver
//! instead of a parse failure of the whole registry response.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Provider registry response
///
/// `core` names the provider currently active for the device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderRegistrySnapshot {
    #[serde(default)]
    pub core: Option<String>,
    #[serde(default)]
    pub providers: BTreeMap<String, ProviderDescriptor>,
}

impl ProviderRegistrySnapshot {
    /// No core provider and nothing configured: the device has not been set
    /// up for authentication yet.
    #[must_use]
    pub fn is_unconfigured(&self) -> bool {
        self.core.is_none() && self.providers.is_empty()
    }
}

/// Identity provider as stored in the registry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
    pub issuer_url: Option<String>,
    pub authorize_url: Option<String>,
    pub token_url: Option<String>,
    pub jwk_url: Option<String>,
    /// `oidc` or `oauth`
    pub kind: Option<String>,
    #[serde(default)]
    pub properties: ProviderProperties,
}

/// Client-side settings attached to a provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderProperties {
    pub client_id: Option<String>,
    pub scope: Option<String>,
    pub redirect_uri: Option<String>,
    pub userinfo_url: Option<String>,
    pub end_session_url: Option<String>,
    pub post_logout_redirect_uri: Option<String>,
    #[serde(skip_serializing)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub code_challenge_methods_supported: Vec<String>,
}

/// OAuth token response from authorization server
///
/// Standard OAuth 2.0 token response format (RFC 6749 §5.1). Refresh tokens
/// are ignored: sessions end with the tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub scope: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl TokenResponse {
    /// Bearer response carrying only an access token.
    #[must_use]
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            id_token: None,
            token_type: default_token_type(),
            expires_in: None,
            scope: None,
        }
    }

    #[must_use]
    pub fn with_id_token(mut self, id_token: impl Into<String>) -> Self {
        self.id_token = Some(id_token.into());
        self
    }
}

/// OAuth error response from authorization server
///
/// Standard OAuth 2.0 error response format (RFC 6749 §5.2), also used for
/// the `error`/`error_description` parameters of a rejected redirect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthError {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl fmt::Display for OAuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error_description {
            Some(desc) => write!(f, "{}: {}", self.error, desc),
            None => write!(f, "{}", self.error),
        }
    }
}

impl std::error::Error for OAuthError {}

/// JSON Web Key Set as published by the issuer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwkSet {
    #[serde(default)]
    pub keys: Vec<Jwk>,
}

impl JwkSet {
    /// Key id of the current signing key.
    ///
    /// Prefers the first key marked `use: sig`; falls back to the first key
    /// carrying a `kid` at all.
    #[must_use]
    pub fn current_signing_kid(&self) -> Option<&str> {
        self.keys
            .iter()
            .find(|key| key.key_use.as_deref() == Some("sig") && key.kid.is_some())
            .or_else(|| self.keys.iter().find(|key| key.kid.is_some()))
            .and_then(|key| key.kid.as_deref())
    }
}

/// Single JSON Web Key; only identification fields are modelled
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    #[serde(default)]
    pub kid: Option<String>,
    #[serde(default)]
    pub kty: Option<String>,
    #[serde(default)]
    pub alg: Option<String>,
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,
}

#[cfg(test)]
mod tests {
    //! Unit tests for auth::types.
    use serde_json::json;

    use super::*;

    #[test]
    fn test_registry_snapshot_parsing() {
        let snapshot: ProviderRegistrySnapshot = serde_json::from_value(json!({
            "core": "keycloak",
            "providers": {
                "keycloak": {
                    "issuer_url": "https://idp.example.com/realms/main",
                    "authorize_url": "https://idp.example.com/auth",
                    "token_url": "https://idp.example.com/token",
                    "jwk_url": "https://idp.example.com/certs",
                    "kind": "oidc",
                    "properties": {
                        "client_id": "device-ui",
                        "scope": "openid profile",
                        "client_secret": "s3cret"
                    }
                }
            }
        }))
        .unwrap();

        assert!(!snapshot.is_unconfigured());
        let provider = &snapshot.providers["keycloak"];
        assert_eq!(provider.kind.as_deref(), Some("oidc"));
        assert_eq!(provider.properties.client_secret.as_deref(), Some("s3cret"));
        assert!(provider.properties.code_challenge_methods_supported.is_empty());
    }

    #[test]
    fn test_empty_registry_is_unconfigured() {
        let snapshot: ProviderRegistrySnapshot =
            serde_json::from_value(json!({"core": null, "providers": {}})).unwrap();
        assert!(snapshot.is_unconfigured());
    }

    #[test]
    fn test_client_secret_never_serialized() {
        let props = ProviderProperties {
            client_secret: Some("s3cret".into()),
            ..ProviderProperties::default()
        };
        let json = serde_json::to_string(&props).unwrap();
        assert!(!json.contains("s3cret"));
    }

    #[test]
    fn test_token_response_defaults() {
        let response: TokenResponse =
            serde_json::from_value(json!({"access_token": "abc"})).unwrap();
        assert_eq!(response.token_type, "Bearer");
        assert!(response.id_token.is_none());
    }

    #[test]
    fn test_oauth_error_display() {
        let error = OAuthError {
            error: "invalid_grant".to_string(),
            error_description: Some("code already used".to_string()),
        };
        assert_eq!(error.to_string(), "invalid_grant: code already used");

        let bare = OAuthError { error: "invalid_request".to_string(), error_description: None };
        assert_eq!(bare.to_string(), "invalid_request");
    }

    #[test]
    fn test_jwks_prefers_signing_key() {
        let jwks: JwkSet = serde_json::from_value(json!({
            "keys": [
                {"kid": "enc-1", "use": "enc"},
                {"kid": "sig-2", "use": "sig"}
            ]
        }))
        .unwrap();
        assert_eq!(jwks.current_signing_kid(), Some("sig-2"));

        let unmarked: JwkSet =
            serde_json::from_value(json!({"keys": [{"kty": "RSA"}, {"kid": "k"}]})).unwrap();
        assert_eq!(unmarked.current_signing_kid(), Some("k"));
        assert_eq!(JwkSet::default().current_signing_kid(), None);
    }
}
