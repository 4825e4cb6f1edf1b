//! Testing utilities and helpers
//!
//! - **[`mocks`]**: Scripted [`OAuthClientTrait`](crate::auth::OAuthClientTrait)
//!   implementation with call counters
//! - **[`fixtures`]**: Unsigned JWT builder for header/claim tests
//!
//! Enabled for this crate's own tests and, for downstream crates, through the
//! `test-utils` feature.

pub mod fixtures;
pub mod mocks;

pub use fixtures::sample_jwt;
pub use mocks::{ExchangeRecord, MockOAuthClient};
