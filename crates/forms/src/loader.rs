//! Settings loader.
//!
//! Fetches one settings category and parses it into its typed struct. A
//! failed load is never fatal: the caller gets the hard-coded defaults and
//! the user gets an error toast.

use thiserror::Error;
use tracing::instrument;

use hearth_core::{CategorySettings, SettingsError};

use crate::backend::SettingsBackend;
use crate::client::ApiError;
use crate::notify::Notifier;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

impl LoadError {
    /// Text suitable for an error toast.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api(e) => format!("Could not load settings: {}", e.user_message()),
            Self::Settings(e) => format!("Settings are misconfigured: {e}"),
        }
    }
}

/// Fetch and parse settings, reporting any failure.
///
/// # Errors
///
/// Returns an error if the request fails or a value cannot be parsed.
#[instrument(skip(backend), fields(category = %T::CATEGORY))]
pub async fn try_load_settings<T, B>(backend: &B) -> Result<T, LoadError>
where
    T: CategorySettings,
    B: SettingsBackend + ?Sized,
{
    let records = backend.fetch_settings(T::CATEGORY).await?;
    let count = records.len();
    let settings = T::from_records(records)?;
    tracing::debug!(records = count, "Settings loaded");
    Ok(settings)
}

/// Fetch and parse settings, falling back to defaults on any failure.
///
/// The failure is shown as a non-blocking error toast. There is no retry.
pub async fn load_settings<T, B, N>(backend: &B, notifier: &N) -> T
where
    T: CategorySettings,
    B: SettingsBackend + ?Sized,
    N: Notifier,
{
    match try_load_settings::<T, B>(backend).await {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!(category = %T::CATEGORY, error = %e, "Using default settings");
            notifier.error(e.user_message());
            T::default()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use hearth_core::settings::keys;
    use hearth_core::{LoginSettings, ProfileSettings, Setting, SettingCategory, SettingUpdate};

    use crate::notify::ToastLog;

    /// In-memory settings store.
    #[derive(Default)]
    pub(crate) struct MemorySettings {
        pub records: Mutex<HashMap<SettingCategory, Vec<Setting>>>,
        pub fail: bool,
        pub updates: Mutex<Vec<(SettingCategory, Vec<SettingUpdate>)>>,
    }

    impl MemorySettings {
        pub(crate) fn with(records: Vec<Setting>) -> Self {
            let store = Self::default();
            for record in records {
                let category = record.category.parse().unwrap();
                store
                    .records
                    .lock()
                    .unwrap()
                    .entry(category)
                    .or_default()
                    .push(record);
            }
            store
        }
    }

    #[async_trait]
    impl SettingsBackend for MemorySettings {
        async fn fetch_settings(
            &self,
            category: SettingCategory,
        ) -> Result<Vec<Setting>, ApiError> {
            if self.fail {
                return Err(ApiError::Api {
                    status: 503,
                    message: "Service unavailable".into(),
                });
            }
            Ok(self
                .records
                .lock()
                .unwrap()
                .get(&category)
                .cloned()
                .unwrap_or_default())
        }

        async fn update_settings(
            &self,
            category: SettingCategory,
            updates: &[SettingUpdate],
        ) -> Result<(), ApiError> {
            if self.fail {
                return Err(ApiError::Api {
                    status: 503,
                    message: "Service unavailable".into(),
                });
            }
            self.updates
                .lock()
                .unwrap()
                .push((category, updates.to_vec()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_records_override_defaults() {
        let backend = MemorySettings::with(vec![
            Setting::new(SettingCategory::Profile, keys::PROFILE_BIO_MAX_LENGTH, "10"),
            Setting::new(SettingCategory::Profile, keys::PROFILE_OCCUPATION_ENABLED, "true"),
        ]);
        let log = ToastLog::new();

        let settings: ProfileSettings = load_settings(&backend, &log).await;
        assert_eq!(settings.bio_max_length, 10);
        assert!(settings.occupation_enabled);
        assert!(settings.website_enabled);
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_failure_falls_back_with_toast() {
        let backend = MemorySettings {
            fail: true,
            ..MemorySettings::default()
        };
        let log = ToastLog::new();

        let settings: LoginSettings = load_settings(&backend, &log).await;
        assert_eq!(settings, LoginSettings::default());
        assert_eq!(log.errors().len(), 1);
        assert!(log.errors()[0].message.contains("Service unavailable"));
    }

    #[tokio::test]
    async fn test_invalid_value_falls_back_with_toast() {
        let backend = MemorySettings::with(vec![Setting::new(
            SettingCategory::Profile,
            keys::PROFILE_BIO_ENABLED,
            "yes",
        )]);
        let log = ToastLog::new();

        let settings: ProfileSettings = load_settings(&backend, &log).await;
        assert_eq!(settings, ProfileSettings::default());
        assert!(log.errors()[0].message.starts_with("Settings are misconfigured"));

        let err = try_load_settings::<ProfileSettings, _>(&backend)
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::Settings(_)));
    }
}
