//! Profile form settings.

use serde::Serialize;

use super::{CategorySettings, SettingsError, SettingsMap, custom_fields_update, keys};
use crate::types::{CustomFields, SettingCategory, SettingUpdate};

/// Upper bound an administrator may set for the bio length.
pub const BIO_MAX_LENGTH_LIMIT: u32 = 5_000;

/// Which optional profile fields are active and how they are bounded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileSettings {
    pub bio_enabled: bool,
    pub bio_max_length: usize,
    pub location_enabled: bool,
    pub website_enabled: bool,
    pub occupation_enabled: bool,
    pub social_links_enabled: bool,
    pub privacy_controls_enabled: bool,
    pub custom_fields: CustomFields,
}

impl Default for ProfileSettings {
    fn default() -> Self {
        Self {
            bio_enabled: true,
            bio_max_length: 500,
            location_enabled: true,
            website_enabled: true,
            occupation_enabled: false,
            social_links_enabled: false,
            privacy_controls_enabled: false,
            custom_fields: CustomFields::new(),
        }
    }
}

impl CategorySettings for ProfileSettings {
    const CATEGORY: SettingCategory = SettingCategory::Profile;

    fn default_entries() -> &'static [(&'static str, &'static str)] {
        &[
            (keys::PROFILE_BIO_ENABLED, "true"),
            (keys::PROFILE_BIO_MAX_LENGTH, "500"),
            (keys::PROFILE_LOCATION_ENABLED, "true"),
            (keys::PROFILE_WEBSITE_ENABLED, "true"),
            (keys::PROFILE_OCCUPATION_ENABLED, "false"),
            (keys::PROFILE_SOCIAL_LINKS_ENABLED, "false"),
            (keys::PROFILE_PRIVACY_CONTROLS_ENABLED, "false"),
            (keys::PROFILE_CUSTOM_FIELDS, "[]"),
        ]
    }

    fn numeric_bounds() -> &'static [(&'static str, u64, u64)] {
        &[(keys::PROFILE_BIO_MAX_LENGTH, 1, BIO_MAX_LENGTH_LIMIT as u64)]
    }

    fn from_map(map: &SettingsMap) -> Result<Self, SettingsError> {
        Ok(Self {
            bio_enabled: map.flag(keys::PROFILE_BIO_ENABLED)?,
            bio_max_length: map.bounded(keys::PROFILE_BIO_MAX_LENGTH, 1, BIO_MAX_LENGTH_LIMIT)?
                as usize,
            location_enabled: map.flag(keys::PROFILE_LOCATION_ENABLED)?,
            website_enabled: map.flag(keys::PROFILE_WEBSITE_ENABLED)?,
            occupation_enabled: map.flag(keys::PROFILE_OCCUPATION_ENABLED)?,
            social_links_enabled: map.flag(keys::PROFILE_SOCIAL_LINKS_ENABLED)?,
            privacy_controls_enabled: map.flag(keys::PROFILE_PRIVACY_CONTROLS_ENABLED)?,
            custom_fields: map.custom_fields(keys::PROFILE_CUSTOM_FIELDS)?,
        })
    }

    fn to_updates(&self) -> Result<Vec<SettingUpdate>, SettingsError> {
        Ok(vec![
            SettingUpdate::new(keys::PROFILE_BIO_ENABLED, self.bio_enabled),
            SettingUpdate::new(keys::PROFILE_BIO_MAX_LENGTH, self.bio_max_length),
            SettingUpdate::new(keys::PROFILE_LOCATION_ENABLED, self.location_enabled),
            SettingUpdate::new(keys::PROFILE_WEBSITE_ENABLED, self.website_enabled),
            SettingUpdate::new(keys::PROFILE_OCCUPATION_ENABLED, self.occupation_enabled),
            SettingUpdate::new(keys::PROFILE_SOCIAL_LINKS_ENABLED, self.social_links_enabled),
            SettingUpdate::new(
                keys::PROFILE_PRIVACY_CONTROLS_ENABLED,
                self.privacy_controls_enabled,
            ),
            custom_fields_update(keys::PROFILE_CUSTOM_FIELDS, &self.custom_fields)?,
        ])
    }
}
