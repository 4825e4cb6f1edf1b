//! Session, user and pending-flow records

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::constants::FALLBACK_SUBJECT;

/// Single-use state created at sign-in and consumed by the callback
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PendingFlowState {
    pub code_verifier: String,
    /// Sent only to OIDC servers that do not advertise S256
    pub nonce: Option<String>,
    /// Sent only to OAuth servers that do not advertise S256
    pub state: Option<String>,
}

/// Normalized identity
///
/// Built from ID-token claims (OIDC) or a userinfo response (OAuth). Claims
/// the engine does not model are kept in `claims`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_username: Option<String>,
    /// Expiry as seconds since the Unix epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
    #[serde(flatten)]
    pub claims: Map<String, Value>,
    pub access_token: String,
}

impl User {
    /// Degraded record used when identity enrichment fails.
    #[must_use]
    pub fn minimal(access_token: impl Into<String>) -> Self {
        Self {
            sub: FALLBACK_SUBJECT.to_string(),
            email: None,
            name: None,
            preferred_username: None,
            exp: None,
            roles: Vec::new(),
            claims: Map::new(),
            access_token: access_token.into(),
        }
    }

    /// Whether this is the degraded fallback record.
    #[must_use]
    pub fn is_minimal(&self) -> bool {
        self.sub == FALLBACK_SUBJECT
    }

    /// Whether a human-readable username is present.
    #[must_use]
    pub const fn has_username(&self) -> bool {
        self.preferred_username.is_some() || self.name.is_some()
    }

    /// Best human-readable label for this user.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.preferred_username
            .as_deref()
            .or(self.name.as_deref())
            .or(self.email.as_deref())
            .unwrap_or(self.sub.as_str())
    }

    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|exp| Utc.timestamp_opt(exp, 0).single())
    }
}

/// Persisted session record
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub access_token: String,
    pub id_token: Option<String>,
    pub user: User,
}
