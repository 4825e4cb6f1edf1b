//! OAuth 2.0 / OpenID Connect client primitives
//!
//! Building blocks for a browser-style Authorization Code + PKCE flow. The
//! engine that sequences them lives in `authgate-core`.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │  authgate-core   │  Engine, resolver, callback processor
//! └────────┬─────────┘
//!          │
//!          ├──► OAuthClient        (token exchange + userinfo over HTTP)
//!          ├──► SessionStorage     (tab-scoped key/value store)
//!          ├──► jwt                (unverified header/claim decoding)
//!          └──► pkce               (verifier, challenge, nonce, state)
//! ```
//!
//! # Module Organization
//!
//! - **[`types`]**: Wire types (registry snapshot, token response, JWKS)
//! - **[`pkce`]**: PKCE challenge generation and state comparison
//! - **[`jwt`]**: JOSE header and claim decoding without verification
//! - **[`client`]**: OAuth HTTP client for code exchange and userinfo
//! - **[`traits`]**: Seams for dependency injection and testing
//! - **[`storage`]**: In-memory session storage
//!
//! # Security Notes
//!
//! - Tokens, verifiers, nonces and codes are never logged
//! - State comparison is constant-time
//! - JWT decoding here performs no signature check; it only reads the key id
//!   and claims of tokens the client already holds

pub mod client;
pub mod jwt;
pub mod pkce;
pub mod storage;
pub mod traits;
pub mod types;

// Re-export commonly used types and functions
pub use client::{OAuthClient, OAuthClientError};
pub use pkce::PkceChallenge;
pub use pkce::{
    generate_code_challenge, generate_code_verifier, generate_nonce, generate_state, validate_state,
};
pub use storage::MemorySessionStorage;
pub use traits::{OAuthClientTrait, SessionStorage};
pub use types::{
    Jwk, JwkSet, OAuthError, ProviderDescriptor, ProviderProperties, ProviderRegistrySnapshot,
    TokenResponse,
};
