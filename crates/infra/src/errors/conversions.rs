//! Conversions from external infrastructure errors into domain errors.

use authgate_domain::AuthError;
use reqwest::Error as HttpError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub AuthError);

impl From<InfraError> for AuthError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<AuthError> for InfraError {
    fn from(value: AuthError) -> Self {
        Self(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoAuthError {
    fn into_auth_error(self) -> AuthError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → AuthError */
/* -------------------------------------------------------------------------- */

impl IntoAuthError for HttpError {
    fn into_auth_error(self) -> AuthError {
        let target = self.url().map(|url| url.to_string()).unwrap_or_else(|| "request".into());

        if self.is_timeout() {
            return AuthError::Network(format!("http timeout calling {target}"));
        }
        if self.is_connect() {
            return AuthError::Network(format!("http connection failed to {target}: {self}"));
        }
        if self.is_builder() {
            return AuthError::Config(format!("invalid http request for {target}: {self}"));
        }
        if self.is_decode() {
            return AuthError::Network(format!("http response from {target} could not be decoded: {self}"));
        }
        if let Some(status) = self.status() {
            return AuthError::Network(format!("http status {status} from {target}"));
        }
        AuthError::Network(format!("http error calling {target}: {self}"))
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        Self(value.into_auth_error())
    }
}

/* -------------------------------------------------------------------------- */
/* serde_json::Error / toml::de::Error → AuthError */
/* -------------------------------------------------------------------------- */

impl IntoAuthError for serde_json::Error {
    fn into_auth_error(self) -> AuthError {
        AuthError::Config(format!("invalid JSON: {self}"))
    }
}

impl From<serde_json::Error> for InfraError {
    fn from(value: serde_json::Error) -> Self {
        Self(value.into_auth_error())
    }
}

impl IntoAuthError for toml::de::Error {
    fn into_auth_error(self) -> AuthError {
        AuthError::Config(format!("invalid TOML: {}", self.message()))
    }
}

impl From<toml::de::Error> for InfraError {
    fn from(value: toml::de::Error) -> Self {
        Self(value.into_auth_error())
    }
}
