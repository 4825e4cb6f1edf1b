//! Authentication engine
//!
//! Components, leaves first:
//!
//! ```text
//! ProviderConfigResolver ──► AuthorizationFlow ──┐
//!          │                                     ├──► SessionStore ──► AuthEngine ──► AuthGate
//!          └───────────────► CallbackProcessor ──┘
//! ```
//!
//! Two single-flight guards keep re-entrant calls from duplicating network
//! round-trips: one around provider resolution, one around the authorization
//! code exchange.

pub mod callback;
pub mod engine;
pub mod flow;
pub mod gate;
pub mod guard;
pub mod ports;
pub mod resolver;
pub mod session;

pub(crate) mod identity;
