//! Settings inspection commands.

use serde::Serialize;
use tracing::info;

use hearth_core::{CategorySettings, LoginSettings, ProfileSettings, RegistrationSettings};
use hearth_forms::{
    RuleKind, Schema, SettingsBackend, TracingNotifier, load_settings, login_schema,
    profile_schema, registration_schema,
};

use crate::FormKind;

async fn load<T, B>(backend: &B) -> T
where
    T: CategorySettings,
    B: SettingsBackend,
{
    load_settings::<T, _, _>(backend, &TracingNotifier).await
}

fn log_settings<T: Serialize>(settings: &T) -> Result<(), serde_json::Error> {
    for line in serde_json::to_string_pretty(settings)?.lines() {
        info!("{line}");
    }
    Ok(())
}

/// Load and print the typed settings behind a form.
///
/// Unreachable or malformed settings fall back to defaults, exactly as the
/// forms do.
///
/// # Errors
///
/// Returns an error if the client cannot be configured.
pub async fn show(form: FormKind) -> Result<(), Box<dyn std::error::Error>> {
    let client = super::client_from_env()?;

    match form {
        FormKind::Profile => log_settings(&load::<ProfileSettings, _>(&client).await)?,
        FormKind::Login => log_settings(&load::<LoginSettings, _>(&client).await)?,
        FormKind::Registration => log_settings(&load::<RegistrationSettings, _>(&client).await)?,
    }

    Ok(())
}

/// Build and print the schema a form would validate against.
///
/// # Errors
///
/// Returns an error if the client cannot be configured.
pub async fn show_schema(form: FormKind) -> Result<(), Box<dyn std::error::Error>> {
    let client = super::client_from_env()?;

    let schema = match form {
        FormKind::Profile => profile_schema(&load(&client).await),
        FormKind::Login => login_schema(&load(&client).await),
        FormKind::Registration => registration_schema(&load(&client).await),
    };

    info!(fields = schema.len(), "Schema for {form:?} form");
    for line in describe_schema(&schema, 0) {
        info!("{line}");
    }
    Ok(())
}

/// One line per rule, nested rules indented under their parent.
#[must_use]
pub fn describe_schema(schema: &Schema, depth: usize) -> Vec<String> {
    let indent = "  ".repeat(depth + 1);
    let mut lines = Vec::new();
    for rule in schema {
        let required = if rule.required { " *" } else { "" };
        lines.push(format!(
            "{indent}{:<24} {}{required}",
            rule.name,
            describe_kind(&rule.kind)
        ));
        if let RuleKind::Object(nested) = &rule.kind {
            lines.extend(describe_schema(nested, depth + 1));
        }
    }
    lines
}

fn describe_kind(kind: &RuleKind) -> String {
    match kind {
        RuleKind::Text { min, max } => match (min, max) {
            (Some(min), Some(max)) => format!("text ({min}..={max})"),
            (Some(min), None) => format!("text (min {min})"),
            (None, Some(max)) => format!("text (max {max})"),
            (None, None) => "text".to_owned(),
        },
        RuleKind::Email => "email".to_owned(),
        RuleKind::Tel => "tel".to_owned(),
        RuleKind::Number => "number".to_owned(),
        RuleKind::Integer { min, max } => format!("integer ({min}..={max})"),
        RuleKind::Date => "date".to_owned(),
        RuleKind::Url => "url".to_owned(),
        RuleKind::Boolean => "boolean".to_owned(),
        RuleKind::Choice(options) => format!("one of [{}]", options.join(", ")),
        RuleKind::Visibility => "visibility".to_owned(),
        RuleKind::Object(_) => "object".to_owned(),
    }
}
