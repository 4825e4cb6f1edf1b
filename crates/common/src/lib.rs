//! OAuth building blocks shared across authgate crates.
//!
//! # Feature Tiers
//!
//! - default: PKCE, JWT decoding, wire types, the HTTP OAuth client and the
//!   tab-scoped session storage
//! - `test-utils`: mock OAuth client and JWT fixtures for downstream tests

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod auth;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(any(feature = "test-utils", test))]
pub mod testing;

pub use auth::{
    MemorySessionStorage, OAuthClient, OAuthClientError, OAuthClientTrait, SessionStorage,
};
