//! # Authgate Domain
//!
//! Data types shared by every authgate crate.
//!
//! This crate contains:
//! - Provider descriptors resolved from the provider registry
//! - Session, user and pending-flow records
//! - The observable authentication state (`AuthPhase` / `AuthState`)
//! - The `AuthError` taxonomy and `Result` alias
//! - Engine configuration and constants
//!
//! ## Architecture
//! - No dependencies on other authgate crates
//! - Only external dependencies allowed
//! - Pure data structures, no I/O

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
