//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `HEARTH_API_BASE_URL` - Base URL of the backend API
//!
//! ## Optional
//! - `HEARTH_API_TOKEN` - Bearer token sent with every request
//! - `HEARTH_HTTP_TIMEOUT_SECS` - Request timeout (default: 30)
//! - `HEARTH_MAX_UPLOAD_BYTES` - Largest accepted media upload (default: 5 MiB)

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const DEFAULT_TIMEOUT_SECS: &str = "30";
const DEFAULT_MAX_UPLOAD_BYTES: &str = "5242880";

/// Values that only ever appear in copied `.env.example` files.
const PLACEHOLDER_PATTERNS: &[&str] = &["your-", "changeme", "replace", "placeholder", "xxx"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Settings for [`ApiClient`](crate::ApiClient).
#[derive(Clone)]
pub struct ClientConfig {
    /// Base URL; always ends with `/` so relative paths join under it.
    pub base_url: Url,
    pub api_token: Option<SecretString>,
    pub timeout: Duration,
    pub max_upload_bytes: usize,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url.as_str())
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .finish()
    }
}

impl ClientConfig {
    /// Configuration with defaults for everything but the base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not an absolute URL.
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_base_url("HEARTH_API_BASE_URL", base_url)?,
            api_token: None,
            timeout: Duration::from_secs(30),
            max_upload_bytes: 5 * 1024 * 1024,
        })
    }

    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(SecretString::from(token.into()));
        self
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup("HEARTH_API_BASE_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("HEARTH_API_BASE_URL".to_string()))?;
        let base_url = parse_base_url("HEARTH_API_BASE_URL", &base_url)?;

        let api_token = match lookup("HEARTH_API_TOKEN").filter(|t| !t.trim().is_empty()) {
            Some(token) => {
                validate_token(&token, "HEARTH_API_TOKEN")?;
                Some(SecretString::from(token))
            }
            None => None,
        };

        let timeout_secs = lookup("HEARTH_HTTP_TIMEOUT_SECS")
            .unwrap_or_else(|| DEFAULT_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("HEARTH_HTTP_TIMEOUT_SECS".to_string(), e.to_string())
            })?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "HEARTH_HTTP_TIMEOUT_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        let max_upload_bytes = lookup("HEARTH_MAX_UPLOAD_BYTES")
            .unwrap_or_else(|| DEFAULT_MAX_UPLOAD_BYTES.to_string())
            .parse::<usize>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("HEARTH_MAX_UPLOAD_BYTES".to_string(), e.to_string())
            })?;

        Ok(Self {
            base_url,
            api_token,
            timeout: Duration::from_secs(timeout_secs),
            max_upload_bytes,
        })
    }

    /// Bearer token value, if one is configured.
    pub(crate) fn bearer(&self) -> Option<&str> {
        self.api_token.as_ref().map(|t| t.expose_secret())
    }
}

fn parse_base_url(var_name: &str, value: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(value.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(var_name.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn validate_token(token: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = token.to_lowercase();
    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("looks like a placeholder (contains '{pattern}')"),
        ));
    }
    Ok(())
}
