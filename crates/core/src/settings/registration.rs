//! Registration form settings.

use serde::Serialize;

use super::{CategorySettings, SettingsError, SettingsMap, custom_fields_update, keys};
use crate::types::{CustomFields, SettingCategory, SettingUpdate};

/// Accepted range of `REGISTRATION_PASSWORD_MIN_LENGTH`.
pub const PASSWORD_MIN_LENGTH_BOUNDS: (u32, u32) = (6, 128);

/// Who may sign up and what they must provide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrationSettings {
    pub enabled: bool,
    pub require_email_verification: bool,
    pub require_terms: bool,
    pub password_min_length: usize,
    pub custom_fields: CustomFields,
}

impl Default for RegistrationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            require_email_verification: true,
            require_terms: false,
            password_min_length: 8,
            custom_fields: CustomFields::new(),
        }
    }
}

impl CategorySettings for RegistrationSettings {
    const CATEGORY: SettingCategory = SettingCategory::Registration;

    fn default_entries() -> &'static [(&'static str, &'static str)] {
        &[
            (keys::REGISTRATION_ENABLED, "true"),
            (keys::REGISTRATION_REQUIRE_EMAIL_VERIFICATION, "true"),
            (keys::REGISTRATION_REQUIRE_TERMS, "false"),
            (keys::REGISTRATION_PASSWORD_MIN_LENGTH, "8"),
            (keys::REGISTRATION_CUSTOM_FIELDS, "[]"),
        ]
    }

    fn numeric_bounds() -> &'static [(&'static str, u64, u64)] {
        &[(
            keys::REGISTRATION_PASSWORD_MIN_LENGTH,
            PASSWORD_MIN_LENGTH_BOUNDS.0 as u64,
            PASSWORD_MIN_LENGTH_BOUNDS.1 as u64,
        )]
    }

    fn from_map(map: &SettingsMap) -> Result<Self, SettingsError> {
        let (min, max) = PASSWORD_MIN_LENGTH_BOUNDS;
        let password_min_length: u32 =
            map.bounded(keys::REGISTRATION_PASSWORD_MIN_LENGTH, min, max)?;
        Ok(Self {
            enabled: map.flag(keys::REGISTRATION_ENABLED)?,
            require_email_verification: map.flag(keys::REGISTRATION_REQUIRE_EMAIL_VERIFICATION)?,
            require_terms: map.flag(keys::REGISTRATION_REQUIRE_TERMS)?,
            password_min_length: password_min_length as usize,
            custom_fields: map.custom_fields(keys::REGISTRATION_CUSTOM_FIELDS)?,
        })
    }

    fn to_updates(&self) -> Result<Vec<SettingUpdate>, SettingsError> {
        Ok(vec![
            SettingUpdate::new(keys::REGISTRATION_ENABLED, self.enabled),
            SettingUpdate::new(
                keys::REGISTRATION_REQUIRE_EMAIL_VERIFICATION,
                self.require_email_verification,
            ),
            SettingUpdate::new(keys::REGISTRATION_REQUIRE_TERMS, self.require_terms),
            SettingUpdate::new(
                keys::REGISTRATION_PASSWORD_MIN_LENGTH,
                self.password_min_length,
            ),
            custom_fields_update(keys::REGISTRATION_CUSTOM_FIELDS, &self.custom_fields)?,
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
            RegistrationSettings::from_map(&RegistrationSettings::defaults()).unwrap(),
            RegistrationSettings::default()
        );
    }

    #[test]
    fn test_malformed_custom_fields() {
        let err = RegistrationSettings::from_records([Setting::new(
            SettingCategory::Registration,
            keys::REGISTRATION_CUSTOM_FIELDS,
            "[{\"name\":",
        )])
        .unwrap_err();
        assert!(matches!(err, SettingsError::CustomFields { .. }));
    }

    #[test]
    fn test_short_password_minimum_rejected() {
        let err = RegistrationSettings::from_records([Setting::new(
            SettingCategory::Registration,
            keys::REGISTRATION_PASSWORD_MIN_LENGTH,
            "3",
        )])
        .unwrap_err();
        assert!(matches!(err, SettingsError::OutOfRange { min: 6, .. }));
    }
}
