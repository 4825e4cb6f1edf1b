//! Authorization callback processing
//!
//! Validates the authorization response on the callback route, exchanges the
//! code exactly once, derives the user identity and commits the session.

use std::sync::Arc;

use authgate_common::auth::{validate_state, OAuthClientError, OAuthClientTrait, TokenResponse};
use authgate_domain::{
    AuthError, PendingFlowState, ProtocolKind, Resolution, ResolvedConfig, Result, Session, User,
};
use tracing::{debug, info, warn};
use url::Url;

use super::guard::SingleFlight;
use super::identity::{self, IdentityError};
use super::resolver::ProviderConfigResolver;
use super::session::SessionStore;

/// Result of one callback invocation
#[derive(Debug, Clone, PartialEq)]
pub enum CallbackOutcome {
    /// Session committed for this user
    Completed(User),
    /// Provider configuration is still being resolved; drive the callback
    /// again once it settles
    Deferred,
}

/// Validated authorization response
#[derive(Debug)]
struct AuthorizationResponse {
    code: String,
    pending: PendingFlowState,
}

/// Processes the redirect back from the authorization server
///
/// Duplicate invocations while one is running join it, so an authorization
/// code is never exchanged twice.
pub struct CallbackProcessor {
    resolver: Arc<ProviderConfigResolver>,
    session: Arc<SessionStore>,
    oauth: Arc<dyn OAuthClientTrait>,
    flight: SingleFlight<Result<CallbackOutcome>>,
}

impl CallbackProcessor {
    pub fn new(
        resolver: Arc<ProviderConfigResolver>,
        session: Arc<SessionStore>,
        oauth: Arc<dyn OAuthClientTrait>,
    ) -> Self {
        Self { resolver, session, oauth, flight: SingleFlight::new() }
    }

    /// Whether a callback is being processed.
    pub fn is_processing(&self) -> bool {
        self.flight.is_running()
    }

    /// Process the callback found at `location`.
    ///
    /// # Errors
    /// - `AuthError::CallbackRejected` when the server returned an `error`
    /// - `AuthError::MissingVerifier` when no sign-in is pending
    /// - `AuthError::StateMismatch` when the echoed `state` does not match
    /// - `AuthError::InvalidCallback` for an unparseable location, a missing
    ///   code, or an OIDC token response whose ID token is missing or carries
    ///   the wrong nonce
    /// - `AuthError::TokenExchange` / `AuthError::Network` when the exchange
    ///   fails
    /// - configuration and storage errors from resolution and persistence
    pub async fn handle_callback(&self, location: &str) -> Result<CallbackOutcome> {
        let resolver = Arc::clone(&self.resolver);
        let session = Arc::clone(&self.session);
        let oauth = Arc::clone(&self.oauth);
        let location = location.to_string();

        let (outcome, joined) = self
            .flight
            .run(move || async move { process(&resolver, &session, oauth.as_ref(), &location).await })
            .await;

        if joined {
            debug!("joined in-flight callback processing");
        }
        outcome
    }
}

async fn process(
    resolver: &ProviderConfigResolver,
    session: &SessionStore,
    oauth: &dyn OAuthClientTrait,
    location: &str,
) -> Result<CallbackOutcome> {
    let config = match resolver.current() {
        Some(Resolution::Ready(config)) => config,
        Some(Resolution::SystemNotReady) => return Err(AuthError::NotReady),
        None if resolver.is_resolving() => {
            debug!("provider resolution in progress; deferring callback");
            return Ok(CallbackOutcome::Deferred);
        }
        None => match resolver.resolve().await? {
            Resolution::Ready(config) => config,
            Resolution::SystemNotReady => return Err(AuthError::NotReady),
        },
    };

    let response = validate_response(&config, session, location).await?;

    let tokens = oauth
        .exchange_code(&config.server, &config.client, &response.code, &response.pending.code_verifier)
        .await
        .map_err(exchange_error)?;

    if config.client.protocol_kind.requires_id_token() {
        identity::verify_id_token(tokens.id_token.as_deref(), response.pending.nonce.as_deref())
            .map_err(|e| {
                warn!(provider = %config.provider_id, reason = %e, "rejecting token response");
                AuthError::InvalidCallback(e.to_string())
            })?;
    }

    let user = match derive_user(&config, oauth, &tokens).await {
        Ok(user) => user,
        Err(e) => {
            warn!(reason = %e, "identity enrichment failed; continuing with minimal user");
            User::minimal(tokens.access_token.as_str())
        }
    };

    session
        .persist(&Session {
            access_token: tokens.access_token.clone(),
            id_token: tokens.id_token.clone(),
            user: user.clone(),
        })
        .await?;

    info!(
        provider = %config.provider_id,
        sub = %user.sub,
        degraded = user.is_minimal(),
        "sign-in completed"
    );
    Ok(CallbackOutcome::Completed(user))
}

/// Check the authorization response against the pending flow.
///
/// The pending state is consumed here whatever the outcome.
async fn validate_response(
    config: &ResolvedConfig,
    session: &SessionStore,
    location: &str,
) -> Result<AuthorizationResponse> {
    let url = Url::parse(location)
        .map_err(|e| AuthError::InvalidCallback(format!("unparseable location: {e}")))?;
    let param = |name: &str| {
        url.query_pairs().find(|(key, _)| key == name).map(|(_, value)| value.into_owned())
    };

    let pending = session.take_pending().await?;

    if let Some(error) = param("error") {
        warn!(error = %error, "authorization server rejected the request");
        return Err(AuthError::CallbackRejected { error, description: param("error_description") });
    }

    let pending = pending.ok_or(AuthError::MissingVerifier)?;

    if let Some(issuer) = param("iss") {
        if issuer != config.server.issuer {
            return Err(AuthError::InvalidCallback(format!(
                "response issuer '{issuer}' does not match '{}'",
                config.server.issuer
            )));
        }
    }

    if let Some(expected) = pending.state.as_deref() {
        let returned = param("state").unwrap_or_default();
        if !validate_state(expected, &returned) {
            return Err(AuthError::StateMismatch);
        }
    }

    let code = param("code")
        .filter(|code| !code.is_empty())
        .ok_or_else(|| AuthError::InvalidCallback("missing authorization code".to_string()))?;

    Ok(AuthorizationResponse { code, pending })
}

async fn derive_user(
    config: &ResolvedConfig,
    oauth: &dyn OAuthClientTrait,
    tokens: &TokenResponse,
) -> std::result::Result<User, IdentityError> {
    match config.client.protocol_kind {
        ProtocolKind::Oidc => {
            let id_token = tokens.id_token.as_deref().ok_or(IdentityError::MissingIdToken)?;
            identity::user_from_id_token(id_token, &tokens.access_token)
        }
        ProtocolKind::OAuth => {
            let endpoint = config
                .server
                .userinfo_endpoint
                .as_deref()
                .ok_or(IdentityError::MissingUserinfoEndpoint)?;
            let expected_subject = identity::token_subject(&tokens.access_token);
            let userinfo = oauth
                .fetch_userinfo(endpoint, &tokens.access_token)
                .await
                .map_err(|e| IdentityError::Userinfo(e.to_string()))?;
            identity::user_from_userinfo(&userinfo, expected_subject.as_deref(), &tokens.access_token)
        }
    }
}

fn exchange_error(err: OAuthClientError) -> AuthError {
    match err {
        OAuthClientError::RequestFailed(e) => AuthError::Network(e.to_string()),
        OAuthClientError::ConfigError(msg) => AuthError::Config(msg),
        other => AuthError::TokenExchange(other.to_string()),
    }
}

/// `location` without its query string and fragment.
pub fn strip_callback_params(location: &str) -> String {
    match Url::parse(location) {
        Ok(mut url) => {
            url.set_query(None);
            url.set_fragment(None);
            url.to_string()
        }
        Err(_) => location.split(['?', '#']).next().unwrap_or_default().to_string(),
    }
}
