//! Authentication constants
//!
//! Callback routes and the keys used in the tab-scoped session storage.

/// Path suffix the authorization server redirects back to.
pub const CALLBACK_PATH: &str = "/oauth/callback";

/// Alias callback path used when the UI is mounted one level deeper.
pub const CALLBACK_ALIAS_PATH: &str = "/ui/oauth/callback";

/// Default HTTP timeout for registry, token, userinfo and JWKS calls.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

// Session storage keys
pub const ACCESS_TOKEN_KEY: &str = "authgate.access_token";
pub const ID_TOKEN_KEY: &str = "authgate.id_token";
pub const USER_KEY: &str = "authgate.user";
pub const CODE_VERIFIER_KEY: &str = "authgate.code_verifier";
pub const NONCE_KEY: &str = "authgate.nonce";
pub const STATE_KEY: &str = "authgate.state";

/// Every key owned by the session store; all are cleared together.
pub const SESSION_KEYS: [&str; 6] =
    [ACCESS_TOKEN_KEY, ID_TOKEN_KEY, USER_KEY, CODE_VERIFIER_KEY, NONCE_KEY, STATE_KEY];

/// `sub` used for the degraded user record when identity enrichment fails.
pub const FALLBACK_SUBJECT: &str = "authenticated";
