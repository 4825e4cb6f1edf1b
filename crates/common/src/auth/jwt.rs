//! Unverified JWT decoding
//!
//! The engine never trusts a token's signature on its own; it only needs the
//! JOSE header (for the `kid` freshness check) and the payload (to recover
//! identity claims) of tokens the client already holds.

use jsonwebtoken::dangerous::insecure_decode;
pub use jsonwebtoken::Header as JwtHeader;
use serde_json::{Map, Value};
use thiserror::Error;

/// Error decoding a compact JWT
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("token is not a compact JWS (expected 3 segments, found {0})")]
    Malformed(usize),

    #[error("invalid token: {0}")]
    Decode(#[from] jsonwebtoken::errors::Error),
}

fn segment_count(token: &str) -> usize {
    token.split('.').count()
}

fn ensure_compact(token: &str) -> Result<(), JwtError> {
    match segment_count(token) {
        3 => Ok(()),
        n => Err(JwtError::Malformed(n)),
    }
}

/// Whether `token` has the three-segment shape of a compact JWS.
#[must_use]
pub fn looks_like_jwt(token: &str) -> bool {
    segment_count(token) == 3
}

/// Decode the JOSE header without verifying the signature.
///
/// # Errors
/// Returns [`JwtError`] if the token is not a compact JWS or the header is not
/// a base64url-encoded JOSE header.
pub fn decode_header(token: &str) -> Result<JwtHeader, JwtError> {
    ensure_compact(token)?;
    Ok(jsonwebtoken::decode_header(token)?)
}

/// Decode the payload claims without verifying the signature or any
/// registered claim.
///
/// # Errors
/// Returns [`JwtError`] if the token is not a compact JWS, or its header or
/// payload does not decode.
pub fn decode_claims(token: &str) -> Result<Map<String, Value>, JwtError> {
    ensure_compact(token)?;
    Ok(insecure_decode::<Map<String, Value>>(token)?.claims)
}
