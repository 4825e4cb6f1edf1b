//! Error types used throughout authgate

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for authentication operations
///
/// `SystemNotReady` is deliberately absent: a device without a configured
/// provider is a valid resolution outcome, not a failure.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum AuthError {
    /// Provider descriptor missing or malformed
    #[error("Configuration error: {0}")]
    Config(String),

    /// `sign_in` called before the provider configuration was resolved
    #[error("Authentication configuration is not ready")]
    NotReady,

    /// Authorization server answered the redirect with an `error` parameter
    #[error("Authorization rejected: {error}")]
    CallbackRejected { error: String, description: Option<String> },

    /// Callback arrived without a stored PKCE code verifier
    #[error("Missing code verifier")]
    MissingVerifier,

    /// Callback location could not be interpreted (no code, bad URL)
    #[error("Invalid callback: {0}")]
    InvalidCallback(String),

    /// Returned `state` does not match the one sent with the request
    #[error("State mismatch in authorization response")]
    StateMismatch,

    /// Code exchange failed at the token endpoint
    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Stable label suitable for structured logging.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::NotReady => "not_ready",
            Self::CallbackRejected { .. } => "callback_rejected",
            Self::MissingVerifier => "missing_verifier",
            Self::InvalidCallback(_) => "invalid_callback",
            Self::StateMismatch => "state_mismatch",
            Self::TokenExchange(_) => "token_exchange",
            Self::Network(_) => "network",
            Self::Storage(_) => "storage",
            Self::Internal(_) => "internal",
        }
    }

    /// Whether a fresh sign-in is the only way forward.
    ///
    /// Network failures may succeed when the consumer retries the same call;
    /// everything else needs a new authorization round-trip or an operator.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::Network(_))
    }
}

/// Result type alias for authentication operations
pub type Result<T> = std::result::Result<T, AuthError>;
