//! Command implementations.

pub mod fields;
pub mod profile;
pub mod settings;

use hearth_forms::{ApiClient, ClientConfig};

/// Build an API client from `HEARTH_*` environment variables.
///
/// # Errors
///
/// Returns an error if the configuration is missing or invalid.
pub fn client_from_env() -> Result<ApiClient, Box<dyn std::error::Error>> {
    let config = ClientConfig::from_env()?;
    tracing::debug!(?config, "Loaded client configuration");
    Ok(ApiClient::new(&config)?)
}
