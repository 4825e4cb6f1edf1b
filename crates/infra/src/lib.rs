//! # Authgate Infrastructure
//!
//! Infrastructure implementations of the engine's ports.
//!
//! This crate contains:
//! - HTTP client with bounded timeouts
//! - Provider registry and JWKS adapters
//! - Configuration loading from environment and files
//! - Tracing subscriber setup
//!
//! ## Architecture
//! - Implements traits defined in `authgate-core`
//! - Contains all "impure" code (network, filesystem, environment)

pub mod config;
pub mod errors;
pub mod http;
pub mod jwks;
pub mod observability;
pub mod registry;
pub mod wiring;

// Re-export commonly used items
pub use errors::InfraError;
pub use http::{HttpClient, HttpClientBuilder};
pub use jwks::HttpSigningKeySource;
pub use observability::{init_tracing, LogFormat};
pub use registry::HttpProviderRegistry;
pub use wiring::engine_builder;
