//! Domain types for the authentication engine

pub mod provider;
pub mod session;
pub mod state;

pub use provider::{
    AuthorizationServerDescriptor, ClientDescriptor, ProtocolKind, Resolution, ResolvedConfig,
};
pub use session::{PendingFlowState, Session, User};
pub use state::{AuthPhase, AuthState, ConfigStatus, GateDecision};
