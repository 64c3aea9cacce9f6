//! Offline profile checks.

use std::path::Path;

use tracing::{error, info};

use hearth_core::ProfileSettings;
use hearth_forms::{FormValues, TracingNotifier, assemble, load_settings, profile_schema};

/// Validate a JSON file of profile form values against the live settings.
///
/// Prints every field error, or the payload that would be sent.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not a JSON object, or
/// fails validation.
pub async fn check(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    let content = tokio::fs::read_to_string(path).await?;
    let values: FormValues = serde_json::from_str(&content)
        .map_err(|e| format!("{file_path} must hold a JSON object of form values: {e}"))?;

    let client = super::client_from_env()?;
    let settings: ProfileSettings = load_settings(&client, &TracingNotifier).await;
    let schema = profile_schema(&settings);

    let unknown: Vec<&str> = values
        .keys()
        .map(String::as_str)
        .filter(|name| !schema.contains(name))
        .collect();
    if !unknown.is_empty() {
        info!(?unknown, "Ignoring fields the current settings do not enable");
    }

    if let Err(errors) = schema.validate(&values) {
        error!("Profile validation failed:");
        for (field, err) in errors.iter() {
            error!("  - {field}: {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }

    let payload = assemble(&schema, &values);
    info!("Profile is valid; payload:");
    for line in serde_json::to_string_pretty(&payload)?.lines() {
        info!("{line}");
    }
    Ok(())
}
