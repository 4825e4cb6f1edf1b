//! Shared test helpers for `authgate-core` integration tests.
//!
//! In-memory fakes for every engine port plus a harness that wires them into
//! an `AuthEngine`, so tests can focus on behaviour instead of boilerplate.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use authgate_common::auth::{
    MemorySessionStorage, ProviderDescriptor, ProviderProperties, ProviderRegistrySnapshot,
};
use authgate_common::testing::MockOAuthClient;
use authgate_core::{AuthEngine, Navigator, ProviderRegistry, ReadinessSignal, SigningKeySource};
use authgate_domain::{EngineConfig, Result as DomainResult};
use parking_lot::Mutex;
use url::Url;

pub const ORIGIN: &str = "https://device.local";
pub const CALLBACK_URL: &str = "https://device.local/oauth/callback";

/// In-memory provider registry that counts lookups.
pub struct FakeRegistry {
    snapshot: Mutex<DomainResult<ProviderRegistrySnapshot>>,
    delay: Duration,
    calls: AtomicUsize,
}

impl FakeRegistry {
    pub fn new(snapshot: ProviderRegistrySnapshot) -> Self {
        Self { snapshot: Mutex::new(Ok(snapshot)), delay: Duration::ZERO, calls: AtomicUsize::new(0) }
    }

    /// Delay each lookup, widening the window for concurrent callers.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn set_snapshot(&self, snapshot: DomainResult<ProviderRegistrySnapshot>) {
        *self.snapshot.lock() = snapshot;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderRegistry for FakeRegistry {
    async fn snapshot(&self) -> DomainResult<ProviderRegistrySnapshot> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.snapshot.lock().clone()
    }
}

/// Signing key source publishing a fixed key id.
pub struct FakeKeys {
    kid: Mutex<Option<String>>,
    calls: AtomicUsize,
}

impl FakeKeys {
    pub fn new(kid: Option<&str>) -> Self {
        Self { kid: Mutex::new(kid.map(str::to_string)), calls: AtomicUsize::new(0) }
    }

    pub fn rotate(&self, kid: &str) {
        *self.kid.lock() = Some(kid.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SigningKeySource for FakeKeys {
    async fn current_key_id(&self) -> DomainResult<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.kid.lock().clone())
    }
}

/// Navigator that records every navigation.
#[derive(Default)]
pub struct RecordingNavigator {
    location: Mutex<String>,
    assigned: Mutex<Vec<Url>>,
    replaced: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn at(location: &str) -> Self {
        Self { location: Mutex::new(location.to_string()), ..Self::default() }
    }

    pub fn set_location(&self, location: &str) {
        *self.location.lock() = location.to_string();
    }

    pub fn assigned(&self) -> Vec<Url> {
        self.assigned.lock().clone()
    }

    pub fn last_assigned(&self) -> Option<Url> {
        self.assigned.lock().last().cloned()
    }

    pub fn replaced(&self) -> Vec<String> {
        self.replaced.lock().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn location(&self) -> String {
        self.location.lock().clone()
    }

    fn assign(&self, url: &Url) {
        self.assigned.lock().push(url.clone());
    }

    fn replace(&self, location: &str) {
        self.replaced.lock().push(location.to_string());
        *self.location.lock() = location.to_string();
    }
}

/// Onboarding flag that tests can flip.
#[derive(Default)]
pub struct Onboarding(AtomicBool);

impl Onboarding {
    pub fn new(onboarded: bool) -> Self {
        Self(AtomicBool::new(onboarded))
    }

    pub fn set(&self, onboarded: bool) {
        self.0.store(onboarded, Ordering::SeqCst);
    }
}

impl ReadinessSignal for Onboarding {
    fn is_onboarded(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Keycloak-style OIDC provider.
pub fn oidc_provider(s256: bool) -> ProviderDescriptor {
    ProviderDescriptor {
        issuer_url: Some("https://idp.example.com/realms/main".into()),
        authorize_url: Some("https://idp.example.com/auth".into()),
        token_url: Some("https://idp.example.com/token".into()),
        jwk_url: Some("https://idp.example.com/certs".into()),
        kind: Some("oidc".into()),
        properties: ProviderProperties {
            client_id: Some("device-ui".into()),
            end_session_url: Some("https://idp.example.com/logout".into()),
            post_logout_redirect_uri: Some(format!("{ORIGIN}/")),
            code_challenge_methods_supported: if s256 { vec!["S256".into()] } else { Vec::new() },
            ..ProviderProperties::default()
        },
    }
}

/// Plain OAuth provider with a userinfo endpoint.
pub fn oauth_provider(s256: bool) -> ProviderDescriptor {
    ProviderDescriptor {
        issuer_url: Some("https://git.example.com".into()),
        authorize_url: Some("https://git.example.com/login/oauth/authorize".into()),
        token_url: Some("https://git.example.com/login/oauth/access_token".into()),
        jwk_url: Some("https://git.example.com/keys".into()),
        kind: Some("oauth".into()),
        properties: ProviderProperties {
            client_id: Some("device-ui".into()),
            client_secret: Some("s3cret".into()),
            userinfo_url: Some("https://git.example.com/api/user".into()),
            code_challenge_methods_supported: if s256 { vec!["S256".into()] } else { Vec::new() },
            ..ProviderProperties::default()
        },
    }
}

pub fn registry_with(id: &str, provider: ProviderDescriptor) -> ProviderRegistrySnapshot {
    ProviderRegistrySnapshot {
        core: Some(id.to_string()),
        providers: BTreeMap::from([(id.to_string(), provider)]),
    }
}

pub fn empty_registry() -> ProviderRegistrySnapshot {
    ProviderRegistrySnapshot::default()
}

/// Engine wired to in-memory fakes, with handles to each of them.
pub struct Harness {
    pub engine: AuthEngine,
    pub registry: Arc<FakeRegistry>,
    pub keys: Arc<FakeKeys>,
    pub navigator: Arc<RecordingNavigator>,
    pub oauth: MockOAuthClient,
    pub storage: MemorySessionStorage,
    pub onboarding: Arc<Onboarding>,
}

impl Harness {
    pub fn new(snapshot: ProviderRegistrySnapshot) -> Self {
        Self::with_registry(FakeRegistry::new(snapshot))
    }

    pub fn with_registry(registry: FakeRegistry) -> Self {
        Self::build(registry, MemorySessionStorage::new())
    }

    /// Harness whose storage already holds entries.
    pub fn with_storage(snapshot: ProviderRegistrySnapshot, storage: MemorySessionStorage) -> Self {
        Self::build(FakeRegistry::new(snapshot), storage)
    }

    fn build(registry: FakeRegistry, storage: MemorySessionStorage) -> Self {
        let registry = Arc::new(registry);
        let keys = Arc::new(FakeKeys::new(Some("k1")));
        let navigator = Arc::new(RecordingNavigator::at(&format!("{ORIGIN}/")));
        let oauth = MockOAuthClient::new();
        let onboarding = Arc::new(Onboarding::new(true));

        let engine = AuthEngine::builder(EngineConfig::new(ORIGIN, format!("{ORIGIN}/api")))
            .registry(Arc::clone(&registry) as Arc<dyn ProviderRegistry>)
            .signing_keys(Arc::clone(&keys) as Arc<dyn SigningKeySource>)
            .navigator(Arc::clone(&navigator) as Arc<dyn Navigator>)
            .storage(Arc::new(storage.clone()))
            .oauth_client(Arc::new(oauth.clone()))
            .readiness(Arc::clone(&onboarding) as Arc<dyn ReadinessSignal>)
            .build()
            .expect("all collaborators supplied");

        Self { engine, registry, keys, navigator, oauth, storage, onboarding }
    }

    /// Query parameters of the last navigation.
    pub fn last_redirect_params(&self) -> BTreeMap<String, String> {
        self.navigator
            .last_assigned()
            .map(|url| url.query_pairs().into_owned().collect())
            .unwrap_or_default()
    }

    /// Point the navigator at the callback route with `query`.
    pub fn land_on_callback(&self, query: &str) {
        self.navigator.set_location(&format!("{CALLBACK_URL}?{query}"));
    }
}
