//! Administrator-defined custom form fields.
//!
//! A category's custom fields are stored as one JSON array inside a single
//! setting value (for example `PROFILE_CUSTOM_FIELDS`). Array order is the
//! display order chosen by drag-reordering in the admin UI, so every
//! operation here preserves it.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::id::CustomFieldId;

/// Field names that would collide with built-in form fields once prefixed
/// into the submitted payload.
pub const RESERVED_NAMES: &[&str] = &[
    "id",
    "name",
    "username",
    "email",
    "password",
    "bio",
    "location",
    "website",
    "occupation",
    "avatar",
    "cover_image",
    "social_links",
];

/// Longest accepted internal field name.
const MAX_NAME_LENGTH: usize = 64;

/// Input kind of a custom field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Email,
    Tel,
    Number,
    Date,
    Select,
    Checkbox,
    Radio,
    Textarea,
}

impl FieldType {
    /// Whether the field picks one of a fixed list of `options`.
    #[must_use]
    pub const fn is_choice(self) -> bool {
        matches!(self, Self::Select | Self::Radio)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Email => "email",
            Self::Tel => "tel",
            Self::Number => "number",
            Self::Date => "date",
            Self::Select => "select",
            Self::Checkbox => "checkbox",
            Self::Radio => "radio",
            Self::Textarea => "textarea",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single administrator-defined field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomField {
    /// Assigned on authoring when a definition file omits it.
    #[serde(default = "CustomFieldId::generate")]
    pub id: CustomFieldId,
    /// Internal identifier; the form key is `custom_<name>`.
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether users may choose who sees this field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privacy: Option<bool>,
}

impl CustomField {
    /// Prefix of the form key that carries a custom field's value.
    pub const FORM_PREFIX: &'static str = "custom_";

    /// Author a new optional field with a freshly generated ID.
    #[must_use]
    pub fn new(name: impl Into<String>, label: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            id: CustomFieldId::generate(),
            name: name.into(),
            label: label.into(),
            field_type,
            required: false,
            options: None,
            placeholder: None,
            description: None,
            privacy: None,
        }
    }

    #[must_use]
    pub const fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    #[must_use]
    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = Some(options.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub const fn with_privacy(mut self, privacy: bool) -> Self {
        self.privacy = Some(privacy);
        self
    }

    /// Key under which the form holds this field's value.
    #[must_use]
    pub fn form_key(&self) -> String {
        format!("{}{}", Self::FORM_PREFIX, self.name)
    }

    /// Options for `select`/`radio` fields; empty for everything else.
    #[must_use]
    pub fn options(&self) -> &[String] {
        self.options.as_deref().unwrap_or_default()
    }

    #[must_use]
    pub fn has_privacy_control(&self) -> bool {
        self.privacy.unwrap_or(false)
    }

    /// Check this field in isolation (name shape, label, options).
    fn validate_shape(&self, position: usize) -> Vec<CustomFieldError> {
        let mut errors = Vec::new();
        let name = self.name.trim();

        if name.is_empty() {
            errors.push(CustomFieldError::EmptyName { position });
        } else if !is_identifier(&self.name) {
            errors.push(CustomFieldError::InvalidName {
                name: self.name.clone(),
            });
        } else if RESERVED_NAMES.contains(&name) {
            errors.push(CustomFieldError::ReservedName {
                name: self.name.clone(),
            });
        }

        if self.label.trim().is_empty() {
            errors.push(CustomFieldError::EmptyLabel {
                name: self.name.clone(),
            });
        }

        if self.field_type.is_choice() {
            if self.options().is_empty() {
                errors.push(CustomFieldError::MissingOptions {
                    name: self.name.clone(),
                });
            }
            let mut seen = HashSet::new();
            for option in self.options() {
                if !seen.insert(option.as_str()) {
                    errors.push(CustomFieldError::DuplicateOption {
                        name: self.name.clone(),
                        option: option.clone(),
                    });
                }
            }
        }

        errors
    }
}

/// Lowercase ASCII identifier: `[a-z][a-z0-9_]*`, bounded length.
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    name.len() <= MAX_NAME_LENGTH
        && chars.next().is_some_and(|c| c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// Problems found while authoring custom fields.
#[derive(Debug, thiserror::Error)]
pub enum CustomFieldError {
    /// Field at `position` has a blank name.
    #[error("field #{position} has an empty name")]
    EmptyName { position: usize },
    /// Name is not a lowercase identifier.
    #[error("field name '{name}' must be lowercase letters, digits and underscores, starting with a letter")]
    InvalidName { name: String },
    /// Name collides with a built-in profile field.
    #[error("field name '{name}' is reserved for a built-in field")]
    ReservedName { name: String },
    /// Two fields share a name.
    #[error("field name '{name}' is used by fields #{first} and #{second}")]
    DuplicateName {
        name: String,
        first: usize,
        second: usize,
    },
    /// Label is blank.
    #[error("field '{name}' has an empty label")]
    EmptyLabel { name: String },
    /// `select` or `radio` field without options.
    #[error("field '{name}' is a choice field but has no options")]
    MissingOptions { name: String },
    /// Same option listed twice.
    #[error("field '{name}' lists option '{option}' more than once")]
    DuplicateOption { name: String, option: String },
    /// Lookup by name found nothing.
    #[error("no field named '{0}'")]
    NotFound(String),
    /// Move or insert past the end of the list.
    #[error("position {position} is out of range for {len} fields")]
    OutOfRange { position: usize, len: usize },
    /// Stored list is not valid JSON.
    #[error("invalid custom field JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Ordered list of custom fields for one settings category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomFields(Vec<CustomField>);

impl CustomFields {
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Deserialize the JSON array stored in a setting value.
    ///
    /// An empty or whitespace-only value is treated as an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`CustomFieldError::Json`] if the value is not a valid array.
    pub fn from_json(value: &str) -> Result<Self, CustomFieldError> {
        if value.trim().is_empty() {
            return Ok(Self::new());
        }
        Ok(serde_json::from_str(value)?)
    }

    /// Serialize back into the setting value representation.
    ///
    /// # Errors
    ///
    /// Returns [`CustomFieldError::Json`] if serialization fails.
    pub fn to_json(&self) -> Result<String, CustomFieldError> {
        Ok(serde_json::to_string(&self.0)?)
    }

    /// Check every authoring rule and report all violations at once.
    ///
    /// Positions in the returned errors are 1-based to match what an
    /// administrator sees in the field list.
    #[must_use]
    pub fn validate(&self) -> Vec<CustomFieldError> {
        let mut errors = Vec::new();
        let mut first_seen: HashMap<&str, usize> = HashMap::new();

        for (index, field) in self.0.iter().enumerate() {
            let position = index + 1;
            errors.extend(field.validate_shape(position));

            let name = field.name.trim();
            if name.is_empty() {
                continue;
            }
            if let Some(&first) = first_seen.get(name) {
                errors.push(CustomFieldError::DuplicateName {
                    name: name.to_owned(),
                    first,
                    second: position,
                });
            } else {
                first_seen.insert(name, position);
            }
        }

        errors
    }

    /// Append a field, rejecting it if it would break an authoring rule.
    ///
    /// # Errors
    ///
    /// Returns the first rule the field violates.
    pub fn try_push(&mut self, field: CustomField) -> Result<(), CustomFieldError> {
        let position = self.0.len() + 1;
        if let Some(error) = field.validate_shape(position).into_iter().next() {
            return Err(error);
        }
        if let Some(first) = self.position_of(&field.name) {
            return Err(CustomFieldError::DuplicateName {
                name: field.name,
                first: first + 1,
                second: position,
            });
        }
        self.0.push(field);
        Ok(())
    }

    /// Remove a field by name, returning it.
    ///
    /// # Errors
    ///
    /// Returns [`CustomFieldError::NotFound`] if no field has that name.
    pub fn remove(&mut self, name: &str) -> Result<CustomField, CustomFieldError> {
        let index = self
            .position_of(name)
            .ok_or_else(|| CustomFieldError::NotFound(name.to_owned()))?;
        Ok(self.0.remove(index))
    }

    /// Move the field at `from` to index `to` (both 0-based), shifting the
    /// fields in between.
    ///
    /// # Errors
    ///
    /// Returns [`CustomFieldError::OutOfRange`] if either index is invalid.
    pub fn reorder(&mut self, from: usize, to: usize) -> Result<(), CustomFieldError> {
        let len = self.0.len();
        for position in [from, to] {
            if position >= len {
                return Err(CustomFieldError::OutOfRange { position, len });
            }
        }
        let field = self.0.remove(from);
        self.0.insert(to, field);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&CustomField> {
        self.0.iter().find(|f| f.name == name)
    }

    fn position_of(&self, name: &str) -> Option<usize> {
        self.0.iter().position(|f| f.name == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CustomField> {
        self.0.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[CustomField] {
        &self.0
    }
}

impl From<Vec<CustomField>> for CustomFields {
    fn from(fields: Vec<CustomField>) -> Self {
        Self(fields)
    }
}

impl FromIterator<CustomField> for CustomFields {
    fn from_iter<I: IntoIterator<Item = CustomField>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a CustomFields {
    type Item = &'a CustomField;
    type IntoIter = std::slice::Iter<'a, CustomField>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl IntoIterator for CustomFields {
    type Item = CustomField;
    type IntoIter = std::vec::IntoIter<CustomField>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn sample() -> CustomFields {
        CustomFields::from(vec![
            CustomField::new("phone", "Phone", FieldType::Tel).required(true),
            CustomField::new("pronouns", "Pronouns", FieldType::Select)
                .with_options(["she/her", "he/him", "they/them"]),
            CustomField::new("newsletter", "Newsletter", FieldType::Checkbox),
            CustomField::new("birthday", "Birthday", FieldType::Date).with_privacy(true),
        ])
    }

    #[test]
    fn test_json_round_trip_preserves_order() {
        let fields = sample();
        let json = fields.to_json().unwrap();
        let parsed = CustomFields::from_json(&json).unwrap();
        assert_eq!(parsed, fields);

        let names: Vec<_> = parsed.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["phone", "pronouns", "newsletter", "birthday"]);
    }

    #[test]
    fn test_wire_format() {
        let json = r#"[{"id":"f1","name":"team","label":"Team","type":"radio","required":true,"options":["red","blue"],"privacy":false}]"#;
        let fields = CustomFields::from_json(json).unwrap();
        let team = fields.get("team").unwrap();
        assert_eq!(team.field_type, FieldType::Radio);
        assert!(team.required);
        assert_eq!(team.options(), ["red", "blue"]);
        assert!(!team.has_privacy_control());
        assert_eq!(team.form_key(), "custom_team");
    }

    #[test]
    fn test_from_json_empty_value() {
        assert!(CustomFields::from_json("").unwrap().is_empty());
        assert!(CustomFields::from_json("[]").unwrap().is_empty());
        assert!(matches!(
            CustomFields::from_json("{not json"),
            Err(CustomFieldError::Json(_))
        ));
    }

    #[test]
    fn test_validate_accepts_sample() {
        assert!(sample().validate().is_empty());
    }

    #[test]
    fn test_validate_reports_duplicates_with_positions() {
        let fields = CustomFields::from(vec![
            CustomField::new("team", "Team", FieldType::Text),
            CustomField::new("phone", "Phone", FieldType::Tel),
            CustomField::new("team", "Team again", FieldType::Text),
        ]);
        let errors = fields.validate();
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            CustomFieldError::DuplicateName { name, first: 1, second: 3 } if name == "team"
        ));
    }

    #[test]
    fn test_validate_reports_every_problem() {
        let fields = CustomFields::from(vec![
            CustomField::new("", "No name", FieldType::Text),
            CustomField::new("Bad Name", "Bad", FieldType::Text),
            CustomField::new("bio", "Bio", FieldType::Textarea),
            CustomField::new("colour", " ", FieldType::Select),
            CustomField::new("size", "Size", FieldType::Radio).with_options(["s", "s"]),
        ]);
        let errors = fields.validate();
        assert!(matches!(errors[0], CustomFieldError::EmptyName { position: 1 }));
        assert!(matches!(errors[1], CustomFieldError::InvalidName { .. }));
        assert!(matches!(errors[2], CustomFieldError::ReservedName { .. }));
        assert!(matches!(errors[3], CustomFieldError::EmptyLabel { .. }));
        assert!(matches!(errors[4], CustomFieldError::MissingOptions { .. }));
        assert!(matches!(errors[5], CustomFieldError::DuplicateOption { .. }));
        assert_eq!(errors.len(), 6);
    }

    #[test]
    fn test_try_push_rejects_duplicate() {
        let mut fields = sample();
        let err = fields
            .try_push(CustomField::new("phone", "Other phone", FieldType::Tel))
            .unwrap_err();
        assert!(matches!(
            err,
            CustomFieldError::DuplicateName { first: 1, second: 5, .. }
        ));
        assert_eq!(fields.len(), 4);

        fields
            .try_push(CustomField::new("company", "Company", FieldType::Text))
            .unwrap();
        assert_eq!(fields.len(), 5);
    }

    #[test]
    fn test_reorder_and_remove() {
        let mut fields = sample();
        fields.reorder(3, 0).unwrap();
        let names: Vec<_> = fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["birthday", "phone", "pronouns", "newsletter"]);

        assert!(matches!(
            fields.reorder(0, 9),
            Err(CustomFieldError::OutOfRange { position: 9, len: 4 })
        ));

        let removed = fields.remove("pronouns").unwrap();
        assert_eq!(removed.field_type, FieldType::Select);
        assert!(matches!(
            fields.remove("pronouns"),
            Err(CustomFieldError::NotFound(_))
        ));
    }
}
