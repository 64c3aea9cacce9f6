//! Typed settings parsed once at the boundary.
//!
//! The backend stores every flag as `"true"`/`"false"` and every bound as a
//! numeric string. A [`SettingsMap`] collects those records on top of the
//! category's hard-coded defaults, and [`CategorySettings::from_map`] turns
//! the result into a plain struct. Nothing downstream parses strings.

mod login;
mod profile;
mod registration;

pub use login::LoginSettings;
pub use profile::ProfileSettings;
pub use registration::RegistrationSettings;

use std::collections::BTreeMap;
use std::str::FromStr;

use thiserror::Error;

use crate::types::{CustomFieldError, CustomFields, Setting, SettingCategory, SettingUpdate};

/// Setting keys understood by the typed structs.
pub mod keys {
    pub const PROFILE_BIO_ENABLED: &str = "PROFILE_BIO_ENABLED";
    pub const PROFILE_BIO_MAX_LENGTH: &str = "PROFILE_BIO_MAX_LENGTH";
    pub const PROFILE_LOCATION_ENABLED: &str = "PROFILE_LOCATION_ENABLED";
    pub const PROFILE_WEBSITE_ENABLED: &str = "PROFILE_WEBSITE_ENABLED";
    pub const PROFILE_OCCUPATION_ENABLED: &str = "PROFILE_OCCUPATION_ENABLED";
    pub const PROFILE_SOCIAL_LINKS_ENABLED: &str = "PROFILE_SOCIAL_LINKS_ENABLED";
    pub const PROFILE_PRIVACY_CONTROLS_ENABLED: &str = "PROFILE_PRIVACY_CONTROLS_ENABLED";
    pub const PROFILE_CUSTOM_FIELDS: &str = "PROFILE_CUSTOM_FIELDS";

    pub const LOGIN_EMAIL_ENABLED: &str = "LOGIN_EMAIL_ENABLED";
    pub const LOGIN_USERNAME_ENABLED: &str = "LOGIN_USERNAME_ENABLED";
    pub const LOGIN_REMEMBER_ME_ENABLED: &str = "LOGIN_REMEMBER_ME_ENABLED";
    pub const LOGIN_MAX_ATTEMPTS: &str = "LOGIN_MAX_ATTEMPTS";
    pub const LOGIN_LOCKOUT_MINUTES: &str = "LOGIN_LOCKOUT_MINUTES";

    pub const REGISTRATION_ENABLED: &str = "REGISTRATION_ENABLED";
    pub const REGISTRATION_REQUIRE_EMAIL_VERIFICATION: &str =
        "REGISTRATION_REQUIRE_EMAIL_VERIFICATION";
    pub const REGISTRATION_REQUIRE_TERMS: &str = "REGISTRATION_REQUIRE_TERMS";
    pub const REGISTRATION_PASSWORD_MIN_LENGTH: &str = "REGISTRATION_PASSWORD_MIN_LENGTH";
    pub const REGISTRATION_CUSTOM_FIELDS: &str = "REGISTRATION_CUSTOM_FIELDS";
}

/// Errors raised while turning string records into typed settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Key absent from both the records and the defaults.
    #[error("setting {0} is missing and has no default")]
    Missing(String),

    /// Value does not parse as the expected type.
    #[error("setting {key} has invalid value '{value}': expected {expected}")]
    InvalidValue {
        key: String,
        value: String,
        expected: &'static str,
    },

    /// Number outside the bounds of its key.
    #[error("setting {key} must be between {min} and {max} (got {value})")]
    OutOfRange {
        key: String,
        value: u64,
        min: u64,
        max: u64,
    },

    /// Custom field list that fails to parse or lint.
    #[error("setting {key} holds invalid custom fields: {source}")]
    CustomFields {
        key: String,
        #[source]
        source: CustomFieldError,
    },
}

/// Flat key/value view of one category's settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsMap {
    values: BTreeMap<String, String>,
}

impl SettingsMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a table of hard-coded defaults.
    #[must_use]
    pub fn with_defaults(defaults: &[(&str, &str)]) -> Self {
        Self {
            values: defaults
                .iter()
                .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                .collect(),
        }
    }

    /// Overlay server records for `category` onto the current values.
    ///
    /// Records tagged with a different category are skipped. Returns the
    /// number of records applied.
    pub fn apply<I>(&mut self, category: SettingCategory, records: I) -> usize
    where
        I: IntoIterator<Item = Setting>,
    {
        let mut applied = 0;
        for record in records {
            if record.is_in(category) {
                self.values.insert(record.key, record.value);
                applied += 1;
            }
        }
        applied
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn require(&self, key: &str) -> Result<&str, SettingsError> {
        self.get(key)
            .ok_or_else(|| SettingsError::Missing(key.to_owned()))
    }

    /// Read a `"true"`/`"false"` flag (case-insensitive, trimmed).
    ///
    /// # Errors
    ///
    /// Returns an error if the key is missing or the value is not a boolean.
    pub fn flag(&self, key: &str) -> Result<bool, SettingsError> {
        let raw = self.require(key)?;
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(SettingsError::InvalidValue {
                key: key.to_owned(),
                value: raw.to_owned(),
                expected: "true or false",
            }),
        }
    }

    /// Read an unsigned integer bounded to `min..=max`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is missing, the value is not a number, or
    /// it falls outside the range.
    pub fn bounded<T>(&self, key: &str, min: T, max: T) -> Result<T, SettingsError>
    where
        T: FromStr + Into<u64> + Copy,
    {
        let raw = self.require(key)?;
        let value: T = raw
            .trim()
            .parse()
            .map_err(|_| SettingsError::InvalidValue {
                key: key.to_owned(),
                value: raw.to_owned(),
                expected: "a whole number",
            })?;
        let (n, lo, hi) = (value.into(), min.into(), max.into());
        if n < lo || n > hi {
            return Err(SettingsError::OutOfRange {
                key: key.to_owned(),
                value: n,
                min: lo,
                max: hi,
            });
        }
        Ok(value)
    }

    /// Read a serialized custom field list.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is missing or the JSON does not parse.
    pub fn custom_fields(&self, key: &str) -> Result<CustomFields, SettingsError> {
        let raw = self.require(key)?;
        CustomFields::from_json(raw).map_err(|source| SettingsError::CustomFields {
            key: key.to_owned(),
            source,
        })
    }
}

/// A typed view over one settings category.
///
/// `Default` must agree with `from_map(&Self::defaults())`; the loader hands
/// out `Default` when the backend cannot be reached.
pub trait CategorySettings: Default + Sized {
    /// Category these settings are fetched from.
    const CATEGORY: SettingCategory;

    /// Hard-coded `(key, value)` defaults in wire representation.
    fn default_entries() -> &'static [(&'static str, &'static str)];

    /// `(key, min, max)` for every numeric setting of the category.
    fn numeric_bounds() -> &'static [(&'static str, u64, u64)] {
        &[]
    }

    /// Parse a merged map into the typed struct.
    ///
    /// # Errors
    ///
    /// Returns the first key whose value cannot be parsed.
    fn from_map(map: &SettingsMap) -> Result<Self, SettingsError>;

    /// Convert back into wire records for `PUT /settings/{category}`.
    ///
    /// # Errors
    ///
    /// Returns an error if a nested value (custom field list) cannot be
    /// serialized.
    fn to_updates(&self) -> Result<Vec<SettingUpdate>, SettingsError>;

    /// A map pre-populated with this category's defaults.
    #[must_use]
    fn defaults() -> SettingsMap {
        SettingsMap::with_defaults(Self::default_entries())
    }

    /// Merge server records over the defaults and parse.
    ///
    /// # Errors
    ///
    /// Returns an error if any merged value cannot be parsed.
    fn from_records<I>(records: I) -> Result<Self, SettingsError>
    where
        I: IntoIterator<Item = Setting>,
    {
        let mut map = Self::defaults();
        map.apply(Self::CATEGORY, records);
        Self::from_map(&map)
    }
}

/// Serialize a custom field list into a setting update.
fn custom_fields_update(key: &str, fields: &CustomFields) -> Result<SettingUpdate, SettingsError> {
    let value = fields.to_json().map_err(|source| SettingsError::CustomFields {
        key: key.to_owned(),
        source,
    })?;
    Ok(SettingUpdate::new(key, value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_skips_other_categories() {
        let mut map = SettingsMap::with_defaults(&[("A", "1")]);
        let applied = map.apply(
            SettingCategory::Profile,
            [
                Setting::new(SettingCategory::Profile, "A", "2"),
                Setting::new(SettingCategory::Login, "B", "3"),
            ],
        );
        assert_eq!(applied, 1);
        assert_eq!(map.get("A"), Some("2"));
        assert_eq!(map.get("B"), None);
    }

    #[test]
    fn test_flag_parsing() {
        let mut map = SettingsMap::new();
        map.insert("ON", " TRUE ");
        map.insert("OFF", "false");
        map.insert("BAD", "yes");
        assert!(map.flag("ON").unwrap());
        assert!(!map.flag("OFF").unwrap());
        assert!(matches!(
            map.flag("BAD"),
            Err(SettingsError::InvalidValue { expected: "true or false", .. })
        ));
        assert!(matches!(map.flag("NONE"), Err(SettingsError::Missing(_))));
    }

    #[test]
    fn test_bounded_parsing() {
        let mut map = SettingsMap::new();
        map.insert("N", "10");
        map.insert("BIG", "100000");
        map.insert("WORD", "ten");
        assert_eq!(map.bounded::<u32>("N", 1, 50).unwrap(), 10);
        assert!(matches!(
            map.bounded::<u32>("BIG", 1, 50),
            Err(SettingsError::OutOfRange { value: 100_000, .. })
        ));
        assert!(matches!(
            map.bounded::<u32>("WORD", 1, 50),
            Err(SettingsError::InvalidValue { .. })
        ));
    }
}
