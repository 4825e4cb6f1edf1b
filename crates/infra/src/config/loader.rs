//! Configuration loader
//!
//! ## Loading Strategy
//! 1. A `.env` file in the working directory is applied to the environment
//! 2. Environment variables are tried first
//! 3. If a required variable is missing, the first config file found by
//!    [`probe_config_paths`] is used
//!
//! ## Environment Variables
//! - `AUTHGATE_ORIGIN`: application origin (required)
//! - `AUTHGATE_REGISTRY_URL`: provider registry base URL (required)
//! - `AUTHGATE_CALLBACK_PATH`: callback path suffix
//! - `AUTHGATE_POST_LOGOUT_REDIRECT`: post-logout redirect target
//! - `AUTHGATE_HTTP_TIMEOUT_SECS`: timeout for outbound HTTP calls
//! - `AUTHGATE_CHECK_TOKEN_EXPIRY`: reject expired persisted tokens
//!   (true/false)
//!
//! ## File Locations
//! `authgate.json` or `authgate.toml` in the working directory, its parent
//! and grandparent, then next to the executable.

use std::path::{Path, PathBuf};

use authgate_domain::{AuthError, EngineConfig, Result};
use url::Url;

use crate::errors::InfraError;

const CONFIG_FILE_NAMES: [&str; 2] = ["authgate.json", "authgate.toml"];

/// Load configuration, preferring the environment over files.
///
/// # Errors
/// Returns `AuthError::Config` if neither source yields a valid
/// configuration.
pub fn load() -> Result<EngineConfig> {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "applied .env file");
    }

    match load_from_env() {
        Ok(config) => {
            tracing::info!("configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = %e, "environment incomplete, trying config file");
            load_from_file(None)
        }
    }
}

/// Load configuration from `AUTHGATE_*` environment variables.
///
/// # Errors
/// Returns `AuthError::Config` if a required variable is missing or a value
/// does not parse.
pub fn load_from_env() -> Result<EngineConfig> {
    let mut config = EngineConfig::new(
        env_var("AUTHGATE_ORIGIN")?,
        env_var("AUTHGATE_REGISTRY_URL")?,
    );

    if let Ok(path) = std::env::var("AUTHGATE_CALLBACK_PATH") {
        config.callback_path = path;
    }
    config.post_logout_redirect = std::env::var("AUTHGATE_POST_LOGOUT_REDIRECT").ok();
    if let Ok(timeout) = std::env::var("AUTHGATE_HTTP_TIMEOUT_SECS") {
        config.http_timeout_secs = timeout
            .parse()
            .map_err(|e| AuthError::Config(format!("invalid HTTP timeout '{timeout}': {e}")))?;
    }
    config.check_token_expiry = env_bool("AUTHGATE_CHECK_TOKEN_EXPIRY", true);

    validate(&config)?;
    Ok(config)
}

/// Load configuration from a file.
///
/// If `path` is `None`, [`probe_config_paths`] picks the file.
///
/// # Errors
/// Returns `AuthError::Config` if the file is missing, unreadable, malformed
/// or invalid.
pub fn load_from_file(path: Option<PathBuf>) -> Result<EngineConfig> {
    let config_path = match path {
        Some(p) if p.exists() => p,
        Some(p) => {
            return Err(AuthError::Config(format!("config file not found: {}", p.display())));
        }
        None => probe_config_paths().ok_or_else(|| {
            AuthError::Config("no config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| AuthError::Config(format!("failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

/// Parse and validate configuration; the format follows the extension of
/// `path` (`.json` or `.toml`).
///
/// # Errors
/// Returns `AuthError::Config` on an unsupported format, a parse failure or
/// an invalid value.
pub fn parse_config(contents: &str, path: &Path) -> Result<EngineConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    let config: EngineConfig = match extension {
        "toml" => toml::from_str(contents).map_err(InfraError::from)?,
        "json" => serde_json::from_str(contents).map_err(InfraError::from)?,
        other => return Err(AuthError::Config(format!("unsupported config format: {other}"))),
    };

    validate(&config)?;
    Ok(config)
}

/// First existing config file among the standard locations.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut dirs = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        dirs.extend(cwd.ancestors().take(3).map(Path::to_path_buf));
    }
    if let Some(exe_dir) =
        std::env::current_exe().ok().and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        dirs.push(exe_dir);
    }

    dirs.iter()
        .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.exists())
}

fn validate(config: &EngineConfig) -> Result<()> {
    for (name, value) in [("origin", &config.origin), ("registry_url", &config.registry_url)] {
        Url::parse(value)
            .map_err(|e| AuthError::Config(format!("invalid {name} '{value}': {e}")))?;
    }
    if !config.callback_path.starts_with('/') {
        return Err(AuthError::Config(format!(
            "callback path '{}' must start with '/'",
            config.callback_path
        )));
    }
    if config.http_timeout_secs == 0 {
        return Err(AuthError::Config("HTTP timeout must be positive".to_string()));
    }
    Ok(())
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key)
        .map_err(|_| AuthError::Config(format!("missing required environment variable: {key}")))
}

/// Accepts `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off`
/// (case-insensitive); anything else reads as false.
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
