//! Login form settings.

use serde::Serialize;

use super::{CategorySettings, SettingsError, SettingsMap, keys};
use crate::types::{SettingCategory, SettingUpdate};

/// Largest accepted `LOGIN_MAX_ATTEMPTS`.
pub const MAX_ATTEMPTS_LIMIT: u32 = 100;

/// Longest accepted `LOGIN_LOCKOUT_MINUTES` (one day).
pub const LOCKOUT_MINUTES_LIMIT: u32 = 24 * 60;

/// How users may sign in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginSettings {
    pub email_enabled: bool,
    pub username_enabled: bool,
    pub remember_me_enabled: bool,
    pub max_attempts: u32,
    pub lockout_minutes: u32,
}

impl Default for LoginSettings {
    fn default() -> Self {
        Self {
            email_enabled: true,
            username_enabled: true,
            remember_me_enabled: true,
            max_attempts: 5,
            lockout_minutes: 15,
        }
    }
}

impl CategorySettings for LoginSettings {
    const CATEGORY: SettingCategory = SettingCategory::Login;

    fn default_entries() -> &'static [(&'static str, &'static str)] {
        &[
            (keys::LOGIN_EMAIL_ENABLED, "true"),
            (keys::LOGIN_USERNAME_ENABLED, "true"),
            (keys::LOGIN_REMEMBER_ME_ENABLED, "true"),
            (keys::LOGIN_MAX_ATTEMPTS, "5"),
            (keys::LOGIN_LOCKOUT_MINUTES, "15"),
        ]
    }

    fn numeric_bounds() -> &'static [(&'static str, u64, u64)] {
        &[
            (keys::LOGIN_MAX_ATTEMPTS, 1, MAX_ATTEMPTS_LIMIT as u64),
            (keys::LOGIN_LOCKOUT_MINUTES, 0, LOCKOUT_MINUTES_LIMIT as u64),
        ]
    }

    fn from_map(map: &SettingsMap) -> Result<Self, SettingsError> {
        let settings = Self {
            email_enabled: map.flag(keys::LOGIN_EMAIL_ENABLED)?,
            username_enabled: map.flag(keys::LOGIN_USERNAME_ENABLED)?,
            remember_me_enabled: map.flag(keys::LOGIN_REMEMBER_ME_ENABLED)?,
            max_attempts: map.bounded(keys::LOGIN_MAX_ATTEMPTS, 1, MAX_ATTEMPTS_LIMIT)?,
            lockout_minutes: map.bounded(keys::LOGIN_LOCKOUT_MINUTES, 0, LOCKOUT_MINUTES_LIMIT)?,
        };

        // Disabling both identifiers would lock every user out.
        if !settings.email_enabled && !settings.username_enabled {
            return Err(SettingsError::InvalidValue {
                key: keys::LOGIN_USERNAME_ENABLED.to_owned(),
                value: "false".to_owned(),
                expected: "email or username login to be enabled",
            });
        }

        Ok(settings)
    }

    fn to_updates(&self) -> Result<Vec<SettingUpdate>, SettingsError> {
        Ok(vec![
            SettingUpdate::new(keys::LOGIN_EMAIL_ENABLED, self.email_enabled),
            SettingUpdate::new(keys::LOGIN_USERNAME_ENABLED, self.username_enabled),
            SettingUpdate::new(keys::LOGIN_REMEMBER_ME_ENABLED, self.remember_me_enabled),
            SettingUpdate::new(keys::LOGIN_MAX_ATTEMPTS, self.max_attempts),
            SettingUpdate::new(keys::LOGIN_LOCKOUT_MINUTES, self.lockout_minutes),
        ])
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::Setting;

    #[test]
    fn test_default_matches_default_entries() {
        assert_eq!(
            LoginSettings::from_map(&LoginSettings::defaults()).unwrap(),
            LoginSettings::default()
        );
    }

    #[test]
    fn test_both_identifiers_disabled_rejected() {
        let err = LoginSettings::from_records([
            Setting::new(SettingCategory::Login, keys::LOGIN_EMAIL_ENABLED, "false"),
            Setting::new(SettingCategory::Login, keys::LOGIN_USERNAME_ENABLED, "false"),
        ])
        .unwrap_err();
        assert!(matches!(err, SettingsError::InvalidValue { .. }));
    }

    #[test]
    fn test_lockout_zero_allowed() {
        let settings = LoginSettings::from_records([Setting::new(
            SettingCategory::Login,
            keys::LOGIN_LOCKOUT_MINUTES,
            "0",
        )])
        .unwrap();
        assert_eq!(settings.lockout_minutes, 0);
    }
}
