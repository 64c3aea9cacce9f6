//! Administrator forms for the settings categories.
//!
//! Fields are keyed by setting key (`LOGIN_MAX_ATTEMPTS`, ...). Flags become
//! checkboxes and bounded numbers become integer inputs; custom field lists
//! are edited through the CLI instead and are carried over untouched.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::Value;
use tracing::instrument;

use hearth_core::{CategorySettings, SettingUpdate, SettingsError, SettingsMap};

use crate::backend::SettingsBackend;
use crate::client::ApiError;
use crate::controller::{FormController, Submitter};
use crate::loader::load_settings;
use crate::notify::Notifier;
use crate::payload::FormPayload;
use crate::schema::{FieldError, FieldRule, FormValues, RuleKind, Schema, ValidationErrors};

/// Schema for editing `T` with one field per flag or numeric setting.
#[must_use]
pub fn settings_schema<T: CategorySettings>() -> Schema {
    let mut schema = Schema::new();
    for (key, default) in T::default_entries() {
        let kind = if let Some((_, min, max)) =
            T::numeric_bounds().iter().find(|(k, _, _)| k == key)
        {
            RuleKind::Integer {
                min: *min,
                max: *max,
            }
        } else if matches!(*default, "true" | "false") {
            RuleKind::Boolean
        } else {
            continue;
        };
        schema.push(FieldRule::new(*key, label_for(key, T::CATEGORY.as_str()), kind));
    }
    schema
}

/// `LOGIN_MAX_ATTEMPTS` -> `Max attempts`.
fn label_for(key: &str, category: &str) -> String {
    let prefix = format!("{}_", category.to_ascii_uppercase());
    let words = key.strip_prefix(&prefix).unwrap_or(key).replace('_', " ");
    let mut chars = words.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase()
    })
}

/// Form values for `settings`, in the shape of [`settings_schema`].
///
/// # Errors
///
/// Returns an error if the settings cannot be turned into records.
pub fn settings_values<T: CategorySettings>(settings: &T) -> Result<FormValues, SettingsError> {
    let schema = settings_schema::<T>();
    let mut values = FormValues::new();
    for update in settings.to_updates()? {
        let Some(rule) = schema.get(&update.key) else {
            continue;
        };
        let value = match rule.kind {
            RuleKind::Boolean => Value::Bool(update.value == "true"),
            _ => update
                .value
                .parse::<u64>()
                .map_or(Value::String(update.value.clone()), Value::from),
        };
        values.insert(update.key, value);
    }
    Ok(values)
}

fn wire_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Writes a settings category with `PUT /settings/{category}`.
///
/// Only the keys of [`settings_schema`] are sent, so custom field lists
/// stored under the category are never overwritten from here.
pub struct SettingsSubmitter<T, B> {
    backend: B,
    current: Mutex<T>,
}

impl<T: CategorySettings + Clone, B> SettingsSubmitter<T, B> {
    #[must_use]
    pub const fn new(backend: B, current: T) -> Self {
        Self {
            backend,
            current: Mutex::new(current),
        }
    }

    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Settings as last loaded or saved.
    #[must_use]
    pub fn current(&self) -> T {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Overlay submitted values onto the current settings and re-parse.
    fn merge(&self, payload: &FormPayload) -> Result<T, SettingsError> {
        let mut map = T::defaults();
        for SettingUpdate { key, value } in self.current().to_updates()? {
            map.insert(key, value);
        }
        overlay(&mut map, payload);
        T::from_map(&map)
    }
}

fn overlay(map: &mut SettingsMap, payload: &FormPayload) {
    for (key, value) in &payload.fields {
        map.insert(key.clone(), wire_value(value));
    }
}

fn settings_error_field(error: &SettingsError) -> (String, FieldError) {
    let reason = error.to_string();
    let key = match error {
        SettingsError::Missing(key)
        | SettingsError::InvalidValue { key, .. }
        | SettingsError::OutOfRange { key, .. }
        | SettingsError::CustomFields { key, .. } => key.clone(),
    };
    (key, FieldError::Rejected { reason })
}

#[async_trait]
impl<T, B> Submitter for SettingsSubmitter<T, B>
where
    T: CategorySettings + Clone + Send + Sync,
    B: SettingsBackend,
{
    type Output = T;

    #[instrument(skip(self, payload), fields(category = %T::CATEGORY))]
    async fn submit(&self, payload: &FormPayload) -> Result<T, ApiError> {
        let not_sent = |e: SettingsError| ApiError::NotSent(e.to_string());
        let next = self.merge(payload).map_err(not_sent)?;

        // Only what the form edits goes out; JSON list settings belong to
        // their own authoring path.
        let editable = settings_schema::<T>();
        let updates: Vec<SettingUpdate> = next
            .to_updates()
            .map_err(not_sent)?
            .into_iter()
            .filter(|update| editable.contains(&update.key))
            .collect();
        self.backend.update_settings(T::CATEGORY, &updates).await?;

        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = next.clone();
        Ok(next)
    }

    fn check(&self, payload: &FormPayload) -> Result<(), ValidationErrors> {
        self.merge(payload).map(|_| ()).map_err(|e| {
            let (key, error) = settings_error_field(&e);
            let mut errors = ValidationErrors::new();
            errors.insert(key, error);
            errors
        })
    }

    fn success_message(&self) -> &str {
        "Settings saved"
    }
}

pub type SettingsForm<T, B, N> = FormController<SettingsSubmitter<T, B>, N>;

/// Load settings of category `T` and open an editing form for them.
///
/// A failed load falls back to defaults (with a toast), like every other
/// settings consumer.
pub async fn open_settings_form<T, B, N>(backend: B, notifier: N) -> SettingsForm<T, B, N>
where
    T: CategorySettings + Clone + Send + Sync,
    B: SettingsBackend,
    N: Notifier,
{
    let settings: T = load_settings(&backend, &notifier).await;
    let initial = settings_values(&settings).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Could not prefill settings form");
        FormValues::new()
    });

    let form = FormController::new(
        format!("{}-settings", T::CATEGORY),
        SettingsSubmitter::new(backend, settings),
        notifier,
    );
    // A new form has no write in flight, so this is never refused.
    let _ = form.ready(settings_schema::<T>(), initial);
    form
}
