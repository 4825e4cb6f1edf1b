//! Observable authentication state

use serde::{Deserialize, Serialize};

use super::session::User;
use crate::errors::AuthError;

/// Authentication phase
///
/// The single source of truth for what the rendering layer sees. Exactly one
/// phase holds at a time, so the gate can match on it exhaustively.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum AuthPhase {
    #[default]
    Loading,
    /// Retained until `clear_error`
    Error(AuthError),
    /// `None` when authentication is bypassed because the system is not set
    /// up yet
    Authenticated(Option<User>),
    Unauthenticated,
}

impl AuthPhase {
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    #[must_use]
    pub const fn error(&self) -> Option<&AuthError> {
        match self {
            Self::Error(err) => Some(err),
            _ => None,
        }
    }
}

/// Flat snapshot of [`AuthPhase`] for consumers that expect the
/// `{isAuthenticated, isLoading, user, error}` record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthState {
    pub is_authenticated: bool,
    pub is_loading: bool,
    pub user: Option<User>,
    pub error: Option<AuthError>,
}

impl From<&AuthPhase> for AuthState {
    fn from(phase: &AuthPhase) -> Self {
        match phase {
            AuthPhase::Loading => Self { is_loading: true, ..Self::default() },
            AuthPhase::Error(err) => Self { error: Some(err.clone()), ..Self::default() },
            AuthPhase::Authenticated(user) => {
                Self { is_authenticated: true, user: user.clone(), ..Self::default() }
            }
            AuthPhase::Unauthenticated => Self::default(),
        }
    }
}

/// What the rendering layer should show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateDecision {
    Children,
    Error,
    Loading,
    Login,
}

/// Provider configuration lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigStatus {
    #[default]
    Uninitialized,
    Resolving,
    SystemNotReady,
    Ready,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_flags_follow_phase() {
        let loading = AuthState::from(&AuthPhase::Loading);
        assert!(loading.is_loading && !loading.is_authenticated);

        let bypassed = AuthState::from(&AuthPhase::Authenticated(None));
        assert!(bypassed.is_authenticated);
        assert!(bypassed.user.is_none());

        let failed = AuthState::from(&AuthPhase::Error(AuthError::MissingVerifier));
        assert_eq!(failed.error, Some(AuthError::MissingVerifier));
        assert!(!failed.is_loading);
    }

    #[test]
    fn snapshot_serializes_camel_case() {
        let json = serde_json::to_value(AuthState::from(&AuthPhase::Unauthenticated)).unwrap();
        assert_eq!(json["isAuthenticated"], false);
        assert_eq!(json["isLoading"], false);
    }
}
