//! Identity normalization
//!
//! Maps ID-token claims, access-token claims and userinfo documents onto the
//! normalized [`User`] record.

use authgate_common::auth::jwt::{self, JwtError};
use authgate_common::auth::validate_state;
use authgate_domain::User;
use serde_json::{Map, Value};
use thiserror::Error;

/// Claims modelled as dedicated `User` fields.
const MODELLED_CLAIMS: [&str; 7] =
    ["sub", "email", "name", "preferred_username", "exp", "roles", "access_token"];

/// Why identity derivation failed
///
/// ID token verification failures reject the callback; every other variant
/// is recovered locally with a minimal user.
#[derive(Debug, Error)]
pub(crate) enum IdentityError {
    #[error("token response carries no id_token")]
    MissingIdToken,

    #[error("provider has no userinfo endpoint")]
    MissingUserinfoEndpoint,

    #[error("claims carry no subject")]
    MissingSubject,

    #[error("id_token nonce does not match the stored nonce")]
    NonceMismatch,

    #[error("userinfo subject '{actual}' does not match token subject '{expected}'")]
    SubjectMismatch { expected: String, actual: String },

    #[error("userinfo lookup failed: {0}")]
    Userinfo(String),

    #[error(transparent)]
    Jwt(#[from] JwtError),
}

/// Build a user from a claim set.
pub(crate) fn user_from_claims(
    claims: &Map<String, Value>,
    access_token: &str,
) -> Result<User, IdentityError> {
    let sub = string_claim(claims, "sub").ok_or(IdentityError::MissingSubject)?;

    Ok(User {
        sub,
        email: string_claim(claims, "email"),
        name: string_claim(claims, "name"),
        preferred_username: string_claim(claims, "preferred_username"),
        exp: claims.get("exp").and_then(numeric_date),
        roles: roles(claims),
        claims: claims
            .iter()
            .filter(|(key, _)| !MODELLED_CLAIMS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect(),
        access_token: access_token.to_string(),
    })
}

/// Check the ID token of an OIDC token response against the stored nonce.
///
/// Runs before the session is committed; a failure here rejects the sign-in
/// instead of degrading it. Returns the ID token.
pub(crate) fn verify_id_token<'a>(
    id_token: Option<&'a str>,
    expected_nonce: Option<&str>,
) -> Result<&'a str, IdentityError> {
    let id_token = id_token.ok_or(IdentityError::MissingIdToken)?;

    if let Some(expected) = expected_nonce {
        let claims = jwt::decode_claims(id_token)?;
        let actual = claims.get("nonce").and_then(Value::as_str).unwrap_or_default();
        if !validate_state(expected, actual) {
            return Err(IdentityError::NonceMismatch);
        }
    }

    Ok(id_token)
}

/// Build a user from the claims of an already verified ID token.
pub(crate) fn user_from_id_token(id_token: &str, access_token: &str) -> Result<User, IdentityError> {
    let claims = jwt::decode_claims(id_token)?;
    user_from_claims(&claims, access_token)
}

/// Build a user from a userinfo document.
///
/// `expected_subject` is the subject the access token advertises, when it is
/// a readable JWT.
pub(crate) fn user_from_userinfo(
    userinfo: &Map<String, Value>,
    expected_subject: Option<&str>,
    access_token: &str,
) -> Result<User, IdentityError> {
    let user = user_from_claims(userinfo, access_token)?;

    if let Some(expected) = expected_subject {
        if user.sub != expected {
            return Err(IdentityError::SubjectMismatch {
                expected: expected.to_string(),
                actual: user.sub,
            });
        }
    }

    Ok(user)
}

/// Subject advertised by an access token, when it is a JWT.
pub(crate) fn token_subject(access_token: &str) -> Option<String> {
    if !jwt::looks_like_jwt(access_token) {
        return None;
    }
    jwt::decode_claims(access_token).ok().and_then(|claims| string_claim(&claims, "sub"))
}

/// Layer access-token claims over a persisted user.
///
/// Token claims win for identity fields; persisted values fill the gaps.
pub(crate) fn layer_token_claims(persisted: &User, token_claims: &Map<String, Value>) -> User {
    let mut claims = persisted.claims.clone();
    claims.extend(
        token_claims
            .iter()
            .filter(|(key, _)| !MODELLED_CLAIMS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone())),
    );

    let token_roles = roles(token_claims);

    User {
        sub: string_claim(token_claims, "sub").unwrap_or_else(|| persisted.sub.clone()),
        email: string_claim(token_claims, "email").or_else(|| persisted.email.clone()),
        name: string_claim(token_claims, "name").or_else(|| persisted.name.clone()),
        preferred_username: string_claim(token_claims, "preferred_username")
            .or_else(|| persisted.preferred_username.clone()),
        exp: token_claims.get("exp").and_then(numeric_date).or(persisted.exp),
        roles: if token_roles.is_empty() { persisted.roles.clone() } else { token_roles },
        claims,
        access_token: persisted.access_token.clone(),
    }
}

fn string_claim(claims: &Map<String, Value>, key: &str) -> Option<String> {
    claims
        .get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// `NumericDate`: integer or fractional seconds.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn numeric_date(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| value.as_f64().map(|secs| secs as i64))
}

/// Roles from a top-level `roles` array or Keycloak-style `realm_access.roles`.
fn roles(claims: &Map<String, Value>) -> Vec<String> {
    claims
        .get("roles")
        .or_else(|| claims.get("realm_access").and_then(|access| access.get("roles")))
        .and_then(Value::as_array)
        .map(|roles| roles.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use authgate_common::testing::sample_jwt;
    use serde_json::json;

    use super::*;

    fn claims(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn claims_map_onto_user_fields() {
        let user = user_from_claims(
            &claims(json!({
                "sub": "u-1",
                "email": "ada@example.com",
                "preferred_username": "ada",
                "exp": 1_900_000_000.5,
                "realm_access": {"roles": ["admin", "viewer"]},
                "access_token": "must-not-leak-into-claims",
                "tenant": "lab"
            })),
            "tok",
        )
        .unwrap();

        assert_eq!(user.sub, "u-1");
        assert_eq!(user.preferred_username.as_deref(), Some("ada"));
        assert_eq!(user.exp, Some(1_900_000_000));
        assert_eq!(user.roles, vec!["admin", "viewer"]);
        assert_eq!(user.claims.get("tenant"), Some(&json!("lab")));
        assert!(!user.claims.contains_key("access_token"));
        assert_eq!(user.access_token, "tok");
    }

    #[test]
    fn missing_subject_fails() {
        let result = user_from_claims(&claims(json!({"email": "x@example.com"})), "tok");
        assert!(matches!(result, Err(IdentityError::MissingSubject)));
    }

    #[test]
    fn id_token_nonce_is_checked_only_when_stored() {
        let token = sample_jwt(&json!({"alg": "RS256"}), &json!({"sub": "u", "nonce": "n-1"}));

        assert!(verify_id_token(Some(&token), Some("n-1")).is_ok());
        assert!(verify_id_token(Some(&token), None).is_ok());
        assert!(matches!(
            verify_id_token(Some(&token), Some("other")),
            Err(IdentityError::NonceMismatch)
        ));
        assert!(matches!(verify_id_token(None, None), Err(IdentityError::MissingIdToken)));
    }

    #[test]
    fn undecodable_id_token_fails_nonce_check() {
        assert!(matches!(
            verify_id_token(Some("not.a.jwt"), Some("n-1")),
            Err(IdentityError::Jwt(_))
        ));
        assert!(verify_id_token(Some("not.a.jwt"), None).is_ok());
    }

    #[test]
    fn id_token_claims_build_user() {
        let token = sample_jwt(&json!({"alg": "RS256"}), &json!({"sub": "u-3", "name": "Lin"}));
        let user = user_from_id_token(&token, "tok").unwrap();
        assert_eq!(user.sub, "u-3");
        assert_eq!(user.name.as_deref(), Some("Lin"));
        assert!(matches!(
            user_from_id_token(&sample_jwt(&json!({"alg": "RS256"}), &json!({})), "tok"),
            Err(IdentityError::MissingSubject)
        ));
    }

    #[test]
    fn userinfo_subject_must_match_token_subject() {
        let info = claims(json!({"sub": "u-1", "name": "Ada"}));

        assert!(user_from_userinfo(&info, Some("u-1"), "tok").is_ok());
        assert!(user_from_userinfo(&info, None, "tok").is_ok());
        assert!(matches!(
            user_from_userinfo(&info, Some("u-2"), "tok"),
            Err(IdentityError::SubjectMismatch { .. })
        ));
    }

    #[test]
    fn token_subject_ignores_opaque_tokens() {
        let token = sample_jwt(&json!({"alg": "RS256"}), &json!({"sub": "u-9"}));
        assert_eq!(token_subject(&token).as_deref(), Some("u-9"));
        assert_eq!(token_subject("opaque-token"), None);
    }

    #[test]
    fn token_claims_win_over_persisted_fields() {
        let mut persisted = User::minimal("tok");
        persisted.email = Some("old@example.com".into());
        persisted.roles = vec!["viewer".into()];

        let layered = layer_token_claims(
            &persisted,
            &claims(json!({"sub": "u-1", "preferred_username": "ada", "scope": "openid"})),
        );

        assert_eq!(layered.sub, "u-1");
        assert_eq!(layered.preferred_username.as_deref(), Some("ada"));
        assert_eq!(layered.email.as_deref(), Some("old@example.com"));
        assert_eq!(layered.roles, vec!["viewer"]);
        assert_eq!(layered.claims.get("scope"), Some(&json!("openid")));
        assert_eq!(layered.access_token, "tok");
    }
}
