//! Custom field authoring commands.
//!
//! Definition files are YAML (or JSON, which YAML accepts) holding either a
//! bare list of fields or a `fields:` key:
//!
//! ```yaml
//! fields:
//!   - name: phone
//!     label: Phone number
//!     type: tel
//!     required: true
//!     privacy: true
//!   - name: shirt_size
//!     label: Shirt size
//!     type: select
//!     options: [S, M, L]
//! ```
//!
//! Field IDs are generated when omitted.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info};

use hearth_core::settings::keys;
use hearth_core::{CustomFieldError, CustomFields, SettingCategory, SettingUpdate};
use hearth_forms::SettingsBackend;

/// Errors that can occur while reading a definition file.
#[derive(Debug, Error)]
pub enum FieldsError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("{0} validation errors found")]
    Invalid(usize),

    #[error("Category '{0}' has no custom fields")]
    NoCustomFields(SettingCategory),

    #[error(transparent)]
    Serialize(#[from] CustomFieldError),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DefinitionFile {
    Wrapped { fields: CustomFields },
    List(CustomFields),
}

impl From<DefinitionFile> for CustomFields {
    fn from(file: DefinitionFile) -> Self {
        match file {
            DefinitionFile::Wrapped { fields } | DefinitionFile::List(fields) => fields,
        }
    }
}

/// Parse a definition file's contents.
///
/// # Errors
///
/// Returns the YAML error if the contents are not a field list.
pub fn parse_definitions(content: &str) -> Result<CustomFields, serde_yaml::Error> {
    serde_yaml::from_str::<DefinitionFile>(content).map(CustomFields::from)
}

/// Read, parse and validate a definition file.
///
/// Every authoring problem is logged before returning.
///
/// # Errors
///
/// Returns an error if the file is missing, unreadable, malformed, or
/// breaks any authoring rule.
pub async fn load_definitions(file_path: &str) -> Result<CustomFields, FieldsError> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(FieldsError::NotFound(file_path.to_string()));
    }

    info!(path = %file_path, "Loading custom field definitions");

    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| FieldsError::Read {
            path: file_path.to_string(),
            source,
        })?;
    let fields = parse_definitions(&content).map_err(|source| FieldsError::Parse {
        path: file_path.to_string(),
        source,
    })?;

    info!(fields = fields.len(), "Parsed definitions");

    let errors = fields.validate();
    if !errors.is_empty() {
        error!("Definition validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(FieldsError::Invalid(errors.len()));
    }

    Ok(fields)
}

/// Setting key that stores the custom field list of `category`.
#[must_use]
pub const fn custom_fields_key(category: SettingCategory) -> Option<&'static str> {
    match category {
        SettingCategory::Profile => Some(keys::PROFILE_CUSTOM_FIELDS),
        SettingCategory::Registration => Some(keys::REGISTRATION_CUSTOM_FIELDS),
        SettingCategory::Login => None,
    }
}

fn log_summary(fields: &CustomFields) {
    for (index, field) in fields.iter().enumerate() {
        let required = if field.required { ", required" } else { "" };
        let private = if field.has_privacy_control() { ", privacy" } else { "" };
        info!(
            "  {}. {} ({}{required}{private}) -> {}",
            index + 1,
            field.name,
            field.field_type,
            field.form_key()
        );
    }
}

/// Validate a definition file without contacting the backend.
///
/// # Errors
///
/// Returns an error if the file fails to load or validate.
pub async fn lint(file_path: &str) -> Result<(), FieldsError> {
    let fields = load_definitions(file_path).await?;
    log_summary(&fields);
    info!("Definitions are valid");
    Ok(())
}

/// Validate a definition file and replace the category's custom fields.
///
/// # Errors
///
/// Returns an error if validation fails, configuration is missing, or the
/// backend rejects the update.
pub async fn publish(
    file_path: &str,
    category: SettingCategory,
) -> Result<(), Box<dyn std::error::Error>> {
    let key = custom_fields_key(category).ok_or(FieldsError::NoCustomFields(category))?;

    // Validate before connecting to the backend
    let fields = load_definitions(file_path).await?;
    log_summary(&fields);

    let client = super::client_from_env()?;
    let update = SettingUpdate::new(key, fields.to_json().map_err(FieldsError::from)?);
    client.update_settings(category, &[update]).await?;

    info!(%category, fields = fields.len(), "Custom fields published");
    Ok(())
}
