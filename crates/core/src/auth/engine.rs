//! Authentication engine
//!
//! Public entry point. Owns the observable [`AuthPhase`] and sequences the
//! resolver, redirect flow, callback processor and session store.

use std::sync::Arc;
use std::time::Duration;

use authgate_common::auth::{MemorySessionStorage, OAuthClient, OAuthClientTrait, SessionStorage};
use authgate_domain::{
    AuthError, AuthPhase, AuthState, ConfigStatus, EngineConfig, GateDecision, Resolution, Result,
};
use parking_lot::RwLock;
use tracing::{debug, error, info, warn};

use super::callback::{strip_callback_params, CallbackOutcome, CallbackProcessor};
use super::flow::AuthorizationFlow;
use super::gate::{is_callback_route, AuthGate};
use super::ports::{AlwaysOnboarded, Navigator, ProviderRegistry, ReadinessSignal, SigningKeySource};
use super::resolver::ProviderConfigResolver;
use super::session::SessionStore;

/// Client-side authentication engine
pub struct AuthEngine {
    config: EngineConfig,
    resolver: Arc<ProviderConfigResolver>,
    session: Arc<SessionStore>,
    flow: AuthorizationFlow,
    callback: CallbackProcessor,
    navigator: Arc<dyn Navigator>,
    readiness: Arc<dyn ReadinessSignal>,
    phase: RwLock<PhaseCell>,
}

/// Observable phase plus a counter bumped on every write, so a slow `start`
/// can tell whether anything else recorded a phase while it was running.
#[derive(Debug)]
struct PhaseCell {
    phase: AuthPhase,
    generation: u64,
}

impl PhaseCell {
    fn set(&mut self, phase: AuthPhase) {
        self.phase = phase;
        self.generation = self.generation.wrapping_add(1);
    }
}

impl AuthEngine {
    /// Start building an engine.
    #[must_use]
    pub fn builder(config: EngineConfig) -> AuthEngineBuilder {
        AuthEngineBuilder::new(config)
    }

    /// Establish the initial authentication state.
    ///
    /// A valid persisted session authenticates without touching the provider
    /// configuration. Otherwise the configuration is resolved; a device with
    /// no provider at all is treated as authenticated without a user.
    ///
    /// An error phase is left in place until [`clear_error`](Self::clear_error),
    /// and a phase recorded by a concurrent callback or sign-out while this
    /// runs is not overwritten.
    ///
    /// # Errors
    /// Storage, registry and configuration errors; each is also recorded as
    /// the error phase.
    pub async fn start(&self) -> Result<()> {
        let generation = self.begin_start();

        if self.guarded(self.session.check_authentication()).await? {
            let phase = self.guarded(self.session.user_from_session()).await?;
            if phase.is_authenticated() {
                info!("restored persisted session");
                self.commit_start(generation, phase);
                return Ok(());
            }
        }

        match self.guarded(self.resolver.resolve()).await? {
            Resolution::SystemNotReady => {
                info!("system not ready; authentication bypassed");
                self.commit_start(generation, AuthPhase::Authenticated(None));
            }
            Resolution::Ready(_) => self.commit_start(generation, AuthPhase::Unauthenticated),
        }
        Ok(())
    }

    /// Navigate to the authorization server.
    ///
    /// # Errors
    /// `AuthError::NotReady` if the provider configuration is not resolved;
    /// check [`is_config_ready`](Self::is_config_ready) first. Redirect build
    /// failures are also recorded as the error phase.
    pub async fn sign_in(&self) -> Result<()> {
        let config = self.resolver.ready_config().ok_or(AuthError::NotReady)?;
        let url = self.guarded(self.flow.build_sign_in_redirect(&config)).await?;
        self.navigator.assign(&url);
        Ok(())
    }

    /// Sign out locally and navigate to the end-session endpoint or origin.
    ///
    /// A session restored at start-up never resolved the provider, so the
    /// configuration is resolved here when needed. Only a device without a
    /// provider, or a failed resolution, falls back to the origin.
    ///
    /// The phase becomes unauthenticated before navigating and is not rolled
    /// back if navigation fails.
    ///
    /// # Errors
    /// Storage or configuration errors while building the redirect.
    pub async fn sign_out(&self) -> Result<()> {
        let session = self.session.current_session().await.unwrap_or_else(|e| {
            debug!(error = %e, "could not read session before sign-out");
            None
        });
        self.set_phase(AuthPhase::Unauthenticated);

        let config = match self.resolver.current() {
            Some(Resolution::Ready(config)) => Some(config),
            Some(Resolution::SystemNotReady) => None,
            None => match self.resolver.resolve().await {
                Ok(Resolution::Ready(config)) => Some(config),
                Ok(Resolution::SystemNotReady) => None,
                Err(e) => {
                    warn!(error = %e, label = e.label(), "could not resolve provider for sign-out");
                    None
                }
            },
        };

        let url = match config {
            Some(config) => self.flow.build_sign_out_redirect(&config, session.as_ref()).await?,
            None => self.flow.build_local_sign_out().await?,
        };

        info!("signed out");
        self.navigator.assign(&url);
        Ok(())
    }

    /// Leave the error phase.
    pub fn clear_error(&self) {
        let mut cell = self.phase.write();
        if matches!(cell.phase, AuthPhase::Error(_)) {
            cell.set(AuthPhase::Unauthenticated);
        }
    }

    /// Process the callback at the navigator's current location.
    ///
    /// On success the location is overwritten without its query string.
    ///
    /// # Errors
    /// Any callback failure; it is also recorded as the error phase.
    pub async fn handle_callback(&self) -> Result<CallbackOutcome> {
        let location = self.navigator.location();
        let outcome = self.guarded(self.callback.handle_callback(&location)).await?;

        if let CallbackOutcome::Completed(user) = &outcome {
            self.set_phase(AuthPhase::Authenticated(Some(user.clone())));
            self.navigator.replace(&strip_callback_params(&location));
        }
        Ok(outcome)
    }

    /// Flat snapshot of the current state.
    pub fn state(&self) -> AuthState {
        AuthState::from(&self.phase.read().phase)
    }

    pub fn phase(&self) -> AuthPhase {
        self.phase.read().phase.clone()
    }

    /// What to render at `location`.
    ///
    /// Inactive (always children) until the device is onboarded.
    pub fn gate(&self, location: &str) -> GateDecision {
        if !self.readiness.is_onboarded() {
            return GateDecision::Children;
        }
        AuthGate::decide(is_callback_route(location, &self.config), &self.phase.read().phase)
    }

    pub fn config_status(&self) -> ConfigStatus {
        self.resolver.status()
    }

    pub fn is_config_ready(&self) -> bool {
        self.config_status() == ConfigStatus::Ready
    }

    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn set_phase(&self, phase: AuthPhase) {
        self.phase.write().set(phase);
    }

    /// Enter the loading phase unless an error is pending; returns the
    /// generation `start` commits against.
    fn begin_start(&self) -> u64 {
        let mut cell = self.phase.write();
        if !matches!(cell.phase, AuthPhase::Error(_)) {
            cell.set(AuthPhase::Loading);
        }
        cell.generation
    }

    fn commit_start(&self, generation: u64, phase: AuthPhase) {
        let mut cell = self.phase.write();
        if cell.generation != generation || matches!(cell.phase, AuthPhase::Error(_)) {
            debug!(
                authenticated = cell.phase.is_authenticated(),
                "phase changed during start; keeping it"
            );
            return;
        }
        cell.set(phase);
    }

    /// Await `operation`, recording a failure as the error phase.
    async fn guarded<T>(&self, operation: impl std::future::Future<Output = Result<T>>) -> Result<T> {
        operation.await.map_err(|e| {
            error!(error = %e, label = e.label(), "authentication operation failed");
            self.set_phase(AuthPhase::Error(e.clone()));
            e
        })
    }
}

/// Builder for [`AuthEngine`]
///
/// The provider registry, signing key source and navigator are required.
/// Storage defaults to [`MemorySessionStorage`], the OAuth client to
/// [`OAuthClient`] with the configured timeout, and readiness to
/// [`AlwaysOnboarded`].
pub struct AuthEngineBuilder {
    config: EngineConfig,
    registry: Option<Arc<dyn ProviderRegistry>>,
    keys: Option<Arc<dyn SigningKeySource>>,
    navigator: Option<Arc<dyn Navigator>>,
    storage: Option<Arc<dyn SessionStorage>>,
    oauth: Option<Arc<dyn OAuthClientTrait>>,
    readiness: Option<Arc<dyn ReadinessSignal>>,
}

impl AuthEngineBuilder {
    fn new(config: EngineConfig) -> Self {
        Self {
            config,
            registry: None,
            keys: None,
            navigator: None,
            storage: None,
            oauth: None,
            readiness: None,
        }
    }

    #[must_use]
    pub fn registry(mut self, registry: Arc<dyn ProviderRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    #[must_use]
    pub fn signing_keys(mut self, keys: Arc<dyn SigningKeySource>) -> Self {
        self.keys = Some(keys);
        self
    }

    #[must_use]
    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    #[must_use]
    pub fn storage(mut self, storage: Arc<dyn SessionStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    #[must_use]
    pub fn oauth_client(mut self, oauth: Arc<dyn OAuthClientTrait>) -> Self {
        self.oauth = Some(oauth);
        self
    }

    #[must_use]
    pub fn readiness(mut self, readiness: Arc<dyn ReadinessSignal>) -> Self {
        self.readiness = Some(readiness);
        self
    }

    /// Assemble the engine.
    ///
    /// # Errors
    /// Returns `AuthError::Config` if a required collaborator is missing or
    /// the default OAuth client cannot be built.
    pub fn build(self) -> Result<AuthEngine> {
        let registry = self.registry.ok_or_else(|| missing("provider registry"))?;
        let keys = self.keys.ok_or_else(|| missing("signing key source"))?;
        let navigator = self.navigator.ok_or_else(|| missing("navigator"))?;
        let storage = self
            .storage
            .unwrap_or_else(|| Arc::new(MemorySessionStorage::new()) as Arc<dyn SessionStorage>);
        let oauth: Arc<dyn OAuthClientTrait> = match self.oauth {
            Some(oauth) => oauth,
            None => Arc::new(
                OAuthClient::new(Duration::from_secs(self.config.http_timeout_secs))
                    .map_err(|e| AuthError::Config(e.to_string()))?,
            ),
        };
        let readiness =
            self.readiness.unwrap_or_else(|| Arc::new(AlwaysOnboarded) as Arc<dyn ReadinessSignal>);

        let session = Arc::new(
            SessionStore::new(storage, keys).with_expiry_check(self.config.check_token_expiry),
        );
        let resolver = Arc::new(ProviderConfigResolver::new(registry, &self.config));

        Ok(AuthEngine {
            flow: AuthorizationFlow::new(Arc::clone(&session), self.config.origin.clone()),
            callback: CallbackProcessor::new(Arc::clone(&resolver), Arc::clone(&session), oauth),
            config: self.config,
            resolver,
            session,
            navigator,
            readiness,
            phase: RwLock::new(PhaseCell { phase: AuthPhase::Loading, generation: 0 }),
        })
    }
}

fn missing(what: &str) -> AuthError {
    AuthError::Config(format!("authentication engine requires a {what}"))
}
