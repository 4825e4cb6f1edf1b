//! # Authgate Core
//!
//! The authentication engine - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port interfaces for the provider registry, signing keys, navigation and
//!   device readiness
//! - Provider configuration resolution
//! - Session persistence and validation on top of tab-scoped storage
//! - The Authorization Code + PKCE redirect flow and callback processing
//! - The `AuthEngine` orchestrator and the `AuthGate` decision function
//!
//! ## Architecture Principles
//! - Only depends on `authgate-common` and `authgate-domain`
//! - No HTTP client construction or environment access
//! - All external dependencies via traits

pub mod auth;

pub use auth::callback::{CallbackOutcome, CallbackProcessor};
pub use auth::engine::{AuthEngine, AuthEngineBuilder};
pub use auth::flow::AuthorizationFlow;
pub use auth::gate::{is_callback_route, AuthGate};
pub use auth::guard::SingleFlight;
pub use auth::ports::{
    AlwaysOnboarded, Navigator, ProviderRegistry, ReadinessSignal, SigningKeySource,
};
pub use auth::resolver::{build_resolution, ProviderConfigResolver};
pub use auth::session::SessionStore;
