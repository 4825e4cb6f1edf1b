//! Test fixture generators

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::Value;

/// Build a compact JWT with the given header and claims.
///
/// The signature segment is a fixed placeholder; nothing in authgate verifies
/// signatures locally.
///
/// # Examples
///
/// ```
/// use authgate_common::testing::sample_jwt;
/// use serde_json::json;
///
/// let token = sample_jwt(&json!({"alg": "RS256", "kid": "k1"}), &json!({"sub": "u-1"}));
/// assert_eq!(token.split('.').count(), 3);
/// ```
#[must_use]
pub fn sample_jwt(header: &Value, claims: &Value) -> String {
    format!(
        "{}.{}.c2lnbmF0dXJl",
        URL_SAFE_NO_PAD.encode(header.to_string()),
        URL_SAFE_NO_PAD.encode(claims.to_string())
    )
}
