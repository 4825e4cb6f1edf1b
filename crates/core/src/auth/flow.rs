//! Sign-in and sign-out redirects
//!
//! Builds the front-channel URLs of the Authorization Code + PKCE flow. The
//! PKCE verifier (and nonce or state, when sent) is stored before the
//! sign-in URL is handed out, so the callback can always find it.

use std::sync::Arc;

use authgate_common::auth::{generate_nonce, generate_state, PkceChallenge};
use authgate_domain::{
    AuthError, PendingFlowState, ProtocolKind, ResolvedConfig, Result, Session,
};
use tracing::{debug, info};
use url::Url;

use super::session::SessionStore;

/// Redirect builder for sign-in and sign-out
pub struct AuthorizationFlow {
    session: Arc<SessionStore>,
    origin: String,
}

impl AuthorizationFlow {
    /// `origin` is where sign-out lands when the provider has no end-session
    /// endpoint.
    pub fn new(session: Arc<SessionStore>, origin: impl Into<String>) -> Self {
        Self { session, origin: origin.into() }
    }

    /// Build the authorization URL and store the pending flow state.
    ///
    /// Servers that do not advertise S256 additionally get a nonce (OIDC) or
    /// a `state` value (OAuth).
    ///
    /// # Errors
    /// Returns `AuthError::Config` if the authorization endpoint is not a
    /// valid URL, or `AuthError::Storage` if the pending state cannot be
    /// stored.
    pub async fn build_sign_in_redirect(&self, config: &ResolvedConfig) -> Result<Url> {
        let mut url = parse_endpoint(&config.server.authorization_endpoint)?;
        let pkce = PkceChallenge::generate();

        let mut pending = PendingFlowState {
            code_verifier: pkce.code_verifier.clone(),
            nonce: None,
            state: None,
        };
        if !config.server.supports_s256() {
            match config.client.protocol_kind {
                ProtocolKind::Oidc => pending.nonce = Some(generate_nonce()),
                ProtocolKind::OAuth => pending.state = Some(generate_state()),
            }
        }

        self.session.save_pending(&pending).await?;

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("response_type", "code")
                .append_pair("client_id", &config.client.client_id)
                .append_pair("redirect_uri", &config.client.redirect_uri)
                .append_pair("scope", &config.client.scope)
                .append_pair("code_challenge", &pkce.code_challenge)
                .append_pair("code_challenge_method", pkce.challenge_method());
            if let Some(nonce) = pending.nonce.as_deref() {
                query.append_pair("nonce", nonce);
            }
            if let Some(state) = pending.state.as_deref() {
                query.append_pair("state", state);
            }
        }

        info!(
            provider = %config.provider_id,
            protocol = %config.client.protocol_kind,
            nonce = pending.nonce.is_some(),
            state = pending.state.is_some(),
            "built sign-in redirect"
        );
        Ok(url)
    }

    /// Clear local state and build the post sign-out destination.
    ///
    /// Uses the end-session endpoint when the provider has one and a
    /// post-logout redirect target is configured; otherwise the application
    /// origin.
    ///
    /// # Errors
    /// Returns `AuthError::Storage` if the session cannot be cleared, or
    /// `AuthError::Config` if the chosen destination is not a valid URL.
    pub async fn build_sign_out_redirect(
        &self,
        config: &ResolvedConfig,
        session: Option<&Session>,
    ) -> Result<Url> {
        self.session.clear().await?;

        let (Some(endpoint), Some(target)) = (
            config.server.end_session_endpoint.as_deref(),
            config.client.post_logout_redirect_uri.as_deref(),
        ) else {
            debug!(provider = %config.provider_id, "no end-session redirect; returning to origin");
            return self.origin_url();
        };

        let mut url = parse_endpoint(endpoint)?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("client_id", &config.client.client_id)
                .append_pair("post_logout_redirect_uri", target);
            if let Some(id_token) = session.and_then(|session| session.id_token.as_deref()) {
                query.append_pair("id_token_hint", id_token);
            }
        }

        info!(provider = %config.provider_id, "built end-session redirect");
        Ok(url)
    }

    /// Clear local state and return the application origin.
    ///
    /// Used when no provider configuration is available.
    ///
    /// # Errors
    /// Returns `AuthError::Storage` if the session cannot be cleared, or
    /// `AuthError::Config` if the origin is not a valid URL.
    pub async fn build_local_sign_out(&self) -> Result<Url> {
        self.session.clear().await?;
        self.origin_url()
    }

    fn origin_url(&self) -> Result<Url> {
        Url::parse(&self.origin)
            .map_err(|e| AuthError::Config(format!("invalid origin '{}': {e}", self.origin)))
    }
}

fn parse_endpoint(endpoint: &str) -> Result<Url> {
    Url::parse(endpoint).map_err(|e| AuthError::Config(format!("invalid endpoint '{endpoint}': {e}")))
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeSet, HashMap};

    use async_trait::async_trait;
    use authgate_common::auth::{generate_code_challenge, MemorySessionStorage};
    use authgate_domain::constants::{CODE_VERIFIER_KEY, NONCE_KEY, STATE_KEY, USER_KEY};
    use authgate_domain::{AuthorizationServerDescriptor, ClientDescriptor, User};

    use super::*;
    use crate::auth::ports::SigningKeySource;

    struct NoKeys;

    #[async_trait]
    impl SigningKeySource for NoKeys {
        async fn current_key_id(&self) -> Result<Option<String>> {
            Ok(None)
        }
    }

    fn flow() -> (AuthorizationFlow, MemorySessionStorage) {
        let storage = MemorySessionStorage::new();
        let session = SessionStore::new(Arc::new(storage.clone()), Arc::new(NoKeys));
        (AuthorizationFlow::new(Arc::new(session), "https://device.local"), storage)
    }

    fn config(kind: ProtocolKind, methods: &[&str]) -> ResolvedConfig {
        ResolvedConfig {
            provider_id: "kc".into(),
            server: AuthorizationServerDescriptor {
                issuer: "https://idp.example.com".into(),
                authorization_endpoint: "https://idp.example.com/authorize?tenant=lab".into(),
                token_endpoint: "https://idp.example.com/token".into(),
                jwks_uri: "https://idp.example.com/jwks".into(),
                userinfo_endpoint: None,
                end_session_endpoint: Some("https://idp.example.com/logout".into()),
                supported_pkce_methods: methods.iter().map(|m| (*m).to_string()).collect::<BTreeSet<_>>(),
            },
            client: ClientDescriptor {
                client_id: "device-ui".into(),
                scope: "openid profile".into(),
                redirect_uri: "https://device.local/oauth/callback".into(),
                protocol_kind: kind,
                client_secret: None,
                post_logout_redirect_uri: Some("https://device.local/".into()),
            },
        }
    }

    fn params(url: &Url) -> HashMap<String, String> {
        url.query_pairs().into_owned().collect()
    }

    #[tokio::test]
    async fn s256_server_gets_challenge_without_nonce() {
        let (flow, storage) = flow();
        let url = flow.build_sign_in_redirect(&config(ProtocolKind::Oidc, &["S256"])).await.unwrap();
        let params = params(&url);

        assert_eq!(params["tenant"], "lab");
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["code_challenge_method"], "S256");
        assert_eq!(params["client_id"], "device-ui");
        assert_eq!(params["redirect_uri"], "https://device.local/oauth/callback");
        assert!(!params.contains_key("nonce"));
        assert!(!params.contains_key("state"));

        let verifier = storage.get_value(CODE_VERIFIER_KEY).unwrap();
        assert_eq!(params["code_challenge"], generate_code_challenge(&verifier));
    }

    #[tokio::test]
    async fn oidc_without_s256_adds_stored_nonce() {
        let (flow, storage) = flow();
        let url = flow.build_sign_in_redirect(&config(ProtocolKind::Oidc, &[])).await.unwrap();
        let params = params(&url);

        assert!(params.contains_key("nonce"));
        assert_eq!(params.get("nonce"), storage.get_value(NONCE_KEY).as_ref());
        assert!(!params.contains_key("state"));
        assert_eq!(params["code_challenge_method"], "S256");
    }

    #[tokio::test]
    async fn oauth_without_s256_adds_stored_state() {
        let (flow, storage) = flow();
        let url = flow.build_sign_in_redirect(&config(ProtocolKind::OAuth, &["plain"])).await.unwrap();
        let params = params(&url);

        assert!(params.contains_key("state"));
        assert_eq!(params.get("state"), storage.get_value(STATE_KEY).as_ref());
        assert!(!params.contains_key("nonce"));
    }

    #[tokio::test]
    async fn sign_out_uses_end_session_endpoint_and_clears_state() {
        let (flow, storage) = flow();
        storage.set_value(USER_KEY, "{}");
        storage.set_value(CODE_VERIFIER_KEY, "v");

        let session = Session {
            access_token: "a".into(),
            id_token: Some("id-token".into()),
            user: User::minimal("a"),
        };
        let url = flow
            .build_sign_out_redirect(&config(ProtocolKind::Oidc, &["S256"]), Some(&session))
            .await
            .unwrap();
        let params = params(&url);

        assert_eq!(url.path(), "/logout");
        assert_eq!(params["post_logout_redirect_uri"], "https://device.local/");
        assert_eq!(params["id_token_hint"], "id-token");
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn sign_out_falls_back_to_origin() {
        let (flow, storage) = flow();
        storage.set_value(USER_KEY, "{}");

        let mut config = config(ProtocolKind::OAuth, &[]);
        config.client.post_logout_redirect_uri = None;

        let url = flow.build_sign_out_redirect(&config, None).await.unwrap();
        assert_eq!(url.as_str(), "https://device.local/");
        assert!(storage.is_empty());

        config.client.post_logout_redirect_uri = Some("https://device.local/".into());
        config.server.end_session_endpoint = None;
        let url = flow.build_sign_out_redirect(&config, None).await.unwrap();
        assert_eq!(url.as_str(), "https://device.local/");
    }
}
