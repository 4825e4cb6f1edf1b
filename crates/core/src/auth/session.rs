//! Session persistence and validation
//!
//! Reads and writes the tab-scoped session record and the pending sign-in
//! state through a [`SessionStorage`]. Reading never fails on bad data: a
//! corrupted, expired or rotated-out session is cleared together with any
//! pending sign-in state and reported as absent.

use std::sync::Arc;

use authgate_common::auth::{jwt, SessionStorage};
use authgate_domain::constants::{
    ACCESS_TOKEN_KEY, CODE_VERIFIER_KEY, ID_TOKEN_KEY, NONCE_KEY, SESSION_KEYS, STATE_KEY,
    USER_KEY,
};
use authgate_domain::{AuthError, AuthPhase, PendingFlowState, Result, Session, User};
use chrono::Utc;
use tracing::{debug, info, warn};

use super::identity;
use super::ports::SigningKeySource;

const PENDING_KEYS: [&str; 3] = [CODE_VERIFIER_KEY, NONCE_KEY, STATE_KEY];

/// Tab-scoped session store
pub struct SessionStore {
    storage: Arc<dyn SessionStorage>,
    keys: Arc<dyn SigningKeySource>,
    check_expiry: bool,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn SessionStorage>, keys: Arc<dyn SigningKeySource>) -> Self {
        Self { storage, keys, check_expiry: true }
    }

    /// Reject persisted tokens whose `exp` claim has passed (on by default).
    #[must_use]
    pub fn with_expiry_check(mut self, enabled: bool) -> Self {
        self.check_expiry = enabled;
        self
    }

    /// Whether a usable session is persisted.
    ///
    /// Requires both an access token and a user record. A token signed under
    /// a key id other than the provider's current one, or one that has
    /// expired, invalidates the session.
    ///
    /// # Errors
    /// Returns `AuthError::Storage` if the storage backend fails.
    pub async fn check_authentication(&self) -> Result<bool> {
        let (Some(token), Some(raw_user)) =
            (self.get(ACCESS_TOKEN_KEY).await?, self.get(USER_KEY).await?)
        else {
            return Ok(false);
        };

        if let Err(e) = serde_json::from_str::<User>(&raw_user) {
            warn!(error = %e, "persisted user record is corrupted; clearing session");
            self.clear().await?;
            return Ok(false);
        }

        if !jwt::looks_like_jwt(&token) {
            debug!("opaque access token; skipping freshness checks");
            return Ok(true);
        }

        if self.check_expiry && self.token_expired(&token).await? {
            return Ok(false);
        }

        let header = match jwt::decode_header(&token) {
            Ok(header) => header,
            Err(e) => {
                warn!(error = %e, "persisted access token is corrupted; clearing session");
                self.clear().await?;
                return Ok(false);
            }
        };

        let Some(token_kid) = header.kid else {
            return Ok(true);
        };

        match self.keys.current_key_id().await {
            Ok(Some(current)) if current != token_kid => {
                info!(
                    token_kid = %token_kid,
                    current_kid = %current,
                    "signing key rotated; invalidating session"
                );
                self.clear().await?;
                Ok(false)
            }
            Ok(_) => Ok(true),
            Err(e) => {
                warn!(error = %e, label = e.label(), "could not fetch current signing key");
                Ok(true)
            }
        }
    }

    /// Authentication phase reconstructed from the persisted session.
    ///
    /// A persisted user without a human-readable username gets the access
    /// token's claims layered on top.
    ///
    /// # Errors
    /// Returns `AuthError::Storage` if the storage backend fails.
    pub async fn user_from_session(&self) -> Result<AuthPhase> {
        let Some(raw_user) = self.get(USER_KEY).await? else {
            return Ok(AuthPhase::Unauthenticated);
        };

        let user = match serde_json::from_str::<User>(&raw_user) {
            Ok(user) => user,
            Err(e) => {
                warn!(error = %e, "persisted user record is corrupted; clearing session");
                self.clear().await?;
                return Ok(AuthPhase::Unauthenticated);
            }
        };

        if user.has_username() || !jwt::looks_like_jwt(&user.access_token) {
            return Ok(AuthPhase::Authenticated(Some(user)));
        }

        match jwt::decode_claims(&user.access_token) {
            Ok(claims) => {
                Ok(AuthPhase::Authenticated(Some(identity::layer_token_claims(&user, &claims))))
            }
            Err(e) => {
                warn!(error = %e, "persisted access token is corrupted; clearing session");
                self.clear().await?;
                Ok(AuthPhase::Unauthenticated)
            }
        }
    }

    /// The persisted session record, if complete and readable.
    ///
    /// # Errors
    /// Returns `AuthError::Storage` if the storage backend fails.
    pub async fn current_session(&self) -> Result<Option<Session>> {
        let (Some(access_token), Some(raw_user)) =
            (self.get(ACCESS_TOKEN_KEY).await?, self.get(USER_KEY).await?)
        else {
            return Ok(None);
        };

        let Ok(user) = serde_json::from_str::<User>(&raw_user) else {
            return Ok(None);
        };

        Ok(Some(Session { access_token, id_token: self.get(ID_TOKEN_KEY).await?, user }))
    }

    /// Persist a new session, replacing any previous one.
    ///
    /// # Errors
    /// Returns `AuthError::Storage` if the storage backend fails, or
    /// `AuthError::Internal` if the user record cannot be encoded.
    pub async fn persist(&self, session: &Session) -> Result<()> {
        let user = serde_json::to_string(&session.user)
            .map_err(|e| AuthError::Internal(format!("failed to encode user record: {e}")))?;

        self.set(ACCESS_TOKEN_KEY, &session.access_token).await?;
        match session.id_token.as_deref() {
            Some(id_token) => self.set(ID_TOKEN_KEY, id_token).await?,
            None => self.remove(ID_TOKEN_KEY).await?,
        }
        self.set(USER_KEY, &user).await?;

        debug!(sub = %session.user.sub, "session persisted");
        Ok(())
    }

    /// Remove every session and pending-flow key.
    ///
    /// # Errors
    /// Returns `AuthError::Storage` if the storage backend fails.
    pub async fn clear(&self) -> Result<()> {
        for key in SESSION_KEYS {
            self.remove(key).await?;
        }
        Ok(())
    }

    /// Store the pending sign-in state, replacing any earlier one.
    ///
    /// # Errors
    /// Returns `AuthError::Storage` if the storage backend fails.
    pub async fn save_pending(&self, pending: &PendingFlowState) -> Result<()> {
        self.set(CODE_VERIFIER_KEY, &pending.code_verifier).await?;
        match pending.nonce.as_deref() {
            Some(nonce) => self.set(NONCE_KEY, nonce).await?,
            None => self.remove(NONCE_KEY).await?,
        }
        match pending.state.as_deref() {
            Some(state) => self.set(STATE_KEY, state).await?,
            None => self.remove(STATE_KEY).await?,
        }
        Ok(())
    }

    /// Read the pending sign-in state without consuming it.
    ///
    /// `None` when no code verifier is stored.
    ///
    /// # Errors
    /// Returns `AuthError::Storage` if the storage backend fails.
    pub async fn load_pending(&self) -> Result<Option<PendingFlowState>> {
        let Some(code_verifier) = self.get(CODE_VERIFIER_KEY).await? else {
            return Ok(None);
        };
        Ok(Some(PendingFlowState {
            code_verifier,
            nonce: self.get(NONCE_KEY).await?,
            state: self.get(STATE_KEY).await?,
        }))
    }

    /// Read and delete the pending sign-in state.
    ///
    /// # Errors
    /// Returns `AuthError::Storage` if the storage backend fails.
    pub async fn take_pending(&self) -> Result<Option<PendingFlowState>> {
        let pending = self.load_pending().await?;
        for key in PENDING_KEYS {
            self.remove(key).await?;
        }
        Ok(pending)
    }

    async fn token_expired(&self, token: &str) -> Result<bool> {
        let claims = match jwt::decode_claims(token) {
            Ok(claims) => claims,
            Err(e) => {
                warn!(error = %e, "persisted access token is corrupted; clearing session");
                self.clear().await?;
                return Ok(true);
            }
        };

        let Some(exp) = claims.get("exp").and_then(identity::numeric_date) else {
            return Ok(false);
        };

        if exp <= Utc::now().timestamp() {
            info!(exp, "persisted access token expired; clearing session");
            self.clear().await?;
            return Ok(true);
        }
        Ok(false)
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.storage.get(key).await.map_err(AuthError::Storage)
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.storage.set(key, value).await.map_err(AuthError::Storage)
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.storage.remove(key).await.map_err(AuthError::Storage)
    }
}
