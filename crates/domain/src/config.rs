//! Engine configuration

use serde::{Deserialize, Serialize};

use crate::constants::{CALLBACK_ALIAS_PATH, CALLBACK_PATH, DEFAULT_HTTP_TIMEOUT_SECS};

/// Authentication engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Application origin, e.g. `http://localhost:8080`
    pub origin: String,
    /// Base URL of the provider registry service
    pub registry_url: String,
    /// Path the authorization server redirects back to
    pub callback_path: String,
    /// Additional paths recognised as the callback route
    pub callback_aliases: Vec<String>,
    /// Where the end-session endpoint should send the browser afterwards
    pub post_logout_redirect: Option<String>,
    pub http_timeout_secs: u64,
    /// Reject persisted access tokens whose `exp` claim has passed
    pub check_token_expiry: bool,
}

impl EngineConfig {
    /// Create a configuration for the given origin and registry, keeping
    /// defaults for everything else.
    #[must_use]
    pub fn new(origin: impl Into<String>, registry_url: impl Into<String>) -> Self {
        Self { origin: origin.into(), registry_url: registry_url.into(), ..Self::default() }
    }

    /// Default redirect URI: origin plus the callback path.
    #[must_use]
    pub fn default_redirect_uri(&self) -> String {
        format!("{}{}", self.origin.trim_end_matches('/'), self.callback_path)
    }

    /// Every path suffix that identifies the callback route.
    pub fn callback_paths(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.callback_path.as_str())
            .chain(self.callback_aliases.iter().map(String::as_str))
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            origin: "http://localhost".to_string(),
            registry_url: "http://localhost/api".to_string(),
            callback_path: CALLBACK_PATH.to_string(),
            callback_aliases: vec![CALLBACK_ALIAS_PATH.to_string()],
            post_logout_redirect: None,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            check_token_expiry: true,
        }
    }
}
