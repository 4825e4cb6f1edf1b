//! PKCE (Proof Key for Code Exchange) implementation for OAuth 2.0
//!
//! Implements RFC 7636 plus the random `nonce`/`state` values used when a
//! server does not advertise S256 support.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Challenge method this crate produces.
pub const CHALLENGE_METHOD: &str = "S256";

fn random_token() -> String {
    let mut rng = rand::thread_rng();
    let random_bytes: [u8; 32] = rng.gen();
    URL_SAFE_NO_PAD.encode(random_bytes)
}

/// Generate a cryptographically secure code verifier
///
/// Returns a URL-safe base64-encoded random string of 32 bytes (43 characters).
/// Per RFC 7636, verifiers must be 43-128 characters long.
#[must_use]
pub fn generate_code_verifier() -> String {
    random_token()
}

/// Generate code challenge from verifier using SHA256
///
/// Per RFC 7636, the challenge is BASE64URL(SHA256(ASCII(code_verifier)))
#[must_use]
pub fn generate_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Generate a random OIDC nonce bound to the ID token.
#[must_use]
pub fn generate_nonce() -> String {
    random_token()
}

/// Generate a random state token for CSRF protection
#[must_use]
pub fn generate_state() -> String {
    random_token()
}

/// Compare the state sent with the request to the one echoed back.
///
/// Runs in time independent of where the first mismatching byte is.
#[must_use]
pub fn validate_state(expected: &str, actual: &str) -> bool {
    let (expected, actual) = (expected.as_bytes(), actual.as_bytes());
    if expected.len() != actual.len() {
        return false;
    }
    expected.iter().zip(actual).fold(0u8, |acc, (a, b)| acc | (a ^ b)) == 0
}

/// PKCE verifier/challenge pair
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    /// Kept secret until token exchange
    pub code_verifier: String,

    /// SHA256 of `code_verifier`, sent in the authorization request
    pub code_challenge: String,
}

impl PkceChallenge {
    /// Generate a fresh verifier and its S256 challenge.
    ///
    /// # Examples
    /// ```
    /// use authgate_common::auth::pkce::PkceChallenge;
    ///
    /// let challenge = PkceChallenge::generate();
    /// assert!(challenge.code_verifier.len() >= 43);
    /// assert!(challenge.code_verifier.len() <= 128);
    /// ```
    #[must_use]
    pub fn generate() -> Self {
        let code_verifier = generate_code_verifier();
        let code_challenge = generate_code_challenge(&code_verifier);
        Self { code_verifier, code_challenge }
    }

    /// Get the challenge method (always "S256" for SHA256)
    #[must_use]
    pub const fn challenge_method(&self) -> &'static str {
        CHALLENGE_METHOD
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for auth::pkce.
    use super::*;

    /// RFC 7636 Appendix B test vector.
    #[test]
    fn test_challenge_matches_rfc_vector() {
        let challenge = generate_code_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk");
        assert_eq!(challenge, "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
    }

    #[test]
    fn test_generate_pkce_challenge() {
        let challenge = PkceChallenge::generate();

        // Verify code_verifier length (RFC 7636: 43-128 chars)
        assert_eq!(challenge.code_verifier.len(), 43);
        assert_eq!(challenge.code_challenge, generate_code_challenge(&challenge.code_verifier));
        assert_eq!(challenge.challenge_method(), "S256");
    }

    #[test]
    fn test_unique_values() {
        assert_ne!(generate_code_verifier(), generate_code_verifier());
        assert_ne!(generate_nonce(), generate_nonce());
        assert_ne!(generate_state(), generate_state());
    }

    /// Verifiers, nonces and states must be usable in a query string verbatim.
    #[test]
    fn test_base64url_encoding() {
        for value in [generate_code_verifier(), generate_nonce(), generate_state()] {
            assert!(value.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        }
    }

    #[test]
    fn test_validate_state() {
        let state = generate_state();
        assert!(validate_state(&state, &state));
        assert!(!validate_state(&state, "short"));

        let mut tampered = state.clone().into_bytes();
        tampered[0] = if tampered[0] == b'A' { b'B' } else { b'A' };
        assert!(!validate_state(&state, &String::from_utf8(tampered).unwrap()));
    }
}
