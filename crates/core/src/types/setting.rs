//! Flat, category-scoped settings records as served by the backend.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The settings categories the backend groups records under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingCategory {
    Profile,
    Login,
    Registration,
}

impl SettingCategory {
    pub const ALL: [Self; 3] = [Self::Profile, Self::Login, Self::Registration];

    /// Path segment used in `/settings/{category}`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Profile => "profile",
            Self::Login => "login",
            Self::Registration => "registration",
        }
    }
}

impl fmt::Display for SettingCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SettingCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown settings category: {s}"))
    }
}

/// A single configuration record.
///
/// Every value is a string on the wire, booleans included. Parse records
/// through [`crate::SettingsMap`] rather than comparing `value` directly.
///
/// `Debug` redacts `value` when `is_secret` is set.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Setting {
    pub key: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub is_secret: bool,
    pub category: String,
}

impl Setting {
    #[must_use]
    pub fn new(category: SettingCategory, key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            description: None,
            is_secret: false,
            category: category.as_str().to_owned(),
        }
    }

    /// Whether this record belongs to `category`.
    #[must_use]
    pub fn is_in(&self, category: SettingCategory) -> bool {
        self.category.eq_ignore_ascii_case(category.as_str())
    }
}

impl fmt::Debug for Setting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value: &dyn fmt::Debug = if self.is_secret {
            &"[REDACTED]"
        } else {
            &self.value
        };
        f.debug_struct("Setting")
            .field("key", &self.key)
            .field("value", value)
            .field("description", &self.description)
            .field("is_secret", &self.is_secret)
            .field("category", &self.category)
            .finish()
    }
}

/// One `{ key, value }` pair in a `PUT /settings/{category}` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingUpdate {
    pub key: String,
    pub value: String,
}

impl SettingUpdate {
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl ToString) -> Self {
        Self {
            key: key.into(),
            value: value.to_string(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_setting_wire_format_is_camel_case() {
        let json = r#"{"key":"K","value":"v","isSecret":true,"category":"login"}"#;
        let setting: Setting = serde_json::from_str(json).unwrap();
        assert!(setting.is_secret);
        assert!(setting.description.is_none());
        assert!(setting.is_in(SettingCategory::Login));

        let out = serde_json::to_string(&setting).unwrap();
        assert!(out.contains("\"isSecret\":true"));
        assert!(!out.contains("description"));
    }

    #[test]
    fn test_secret_setting_debug_redacts_value() {
        let mut setting = Setting::new(SettingCategory::Registration, "REGISTRATION_INVITE_CODE", "hunter2");
        setting.is_secret = true;
        let debug_output = format!("{setting:?}");
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("hunter2"));
    }

    #[test]
    fn test_plain_setting_debug_shows_value() {
        let setting = Setting::new(SettingCategory::Profile, "PROFILE_BIO_ENABLED", "true");
        assert!(format!("{setting:?}").contains("\"true\""));
    }

    #[test]
    fn test_category_from_str() {
        assert_eq!(
            "Registration".parse::<SettingCategory>().unwrap(),
            SettingCategory::Registration
        );
        assert!("billing".parse::<SettingCategory>().is_err());
        assert!("integrations".parse::<SettingCategory>().is_err());
    }
}
