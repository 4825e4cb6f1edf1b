//! Observability infrastructure
//!
//! Installs the global `tracing` subscriber. The engine itself only emits
//! events; binaries and tests decide where they go.

pub mod logging;

pub use logging::{init_tracing, LogFormat};
