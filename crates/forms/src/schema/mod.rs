//! Runtime validation schemas.
//!
//! A [`Schema`] is an ordered list of named [`FieldRule`]s derived from the
//! loaded settings. It is rebuilt whenever settings or custom field
//! definitions change; features that are switched off simply have no rule,
//! so no validation error can ever mention them.
//!
//! Form values are plain JSON (`serde_json::Map`), since custom checkbox
//! fields carry booleans and the social links field is a nested object.

mod builder;
mod rules;

pub use builder::{
    COVER_IMAGE, PRIVACY_PREFIX, SOCIAL_LINKS, custom_field_rule, login_schema, privacy_key,
    profile_schema, registration_schema,
};

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use hearth_core::Visibility;

/// Values of a form keyed by field name.
pub type FormValues = Map<String, Value>;

/// Shape a value must have.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleKind {
    /// Free text with optional character bounds.
    Text {
        min: Option<usize>,
        max: Option<usize>,
    },
    Email,
    Tel,
    /// Any decimal number.
    Number,
    /// Whole number within a range (settings forms).
    Integer { min: u64, max: u64 },
    /// Calendar date as `YYYY-MM-DD`.
    Date,
    /// Absolute `http`/`https` URL.
    Url,
    Boolean,
    /// One of a fixed list; any string when the list is empty.
    Choice(Vec<String>),
    /// `public | friends | private`.
    Visibility,
    /// Nested object validated by its own schema.
    Object(Schema),
}

/// Validation rule for a single named field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRule {
    pub name: String,
    pub label: String,
    pub kind: RuleKind,
    pub required: bool,
}

impl FieldRule {
    #[must_use]
    pub fn new(name: impl Into<String>, label: impl Into<String>, kind: RuleKind) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            kind,
            required: false,
        }
    }

    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Value a fresh form starts with for this field.
    #[must_use]
    pub fn default_value(&self) -> Value {
        match &self.kind {
            RuleKind::Boolean => Value::Bool(false),
            RuleKind::Visibility => Value::String(Visibility::default().as_str().to_owned()),
            RuleKind::Object(schema) => Value::Object(schema.default_values()),
            _ => Value::String(String::new()),
        }
    }

    /// Validate one value against this rule.
    ///
    /// Missing, `null`, blank strings and `false` count as empty: they fail
    /// a required rule and pass an optional one without further checks.
    ///
    /// # Errors
    ///
    /// Returns the field-level error for the value.
    pub fn check(&self, value: Option<&Value>) -> Result<(), FieldError> {
        if is_empty(value) {
            return if self.required {
                Err(FieldError::Required)
            } else {
                Ok(())
            };
        }
        let Some(value) = value else {
            return Ok(());
        };

        match &self.kind {
            RuleKind::Text { min, max } => {
                let text = expect_str(value, "text")?;
                let len = text.chars().count();
                if let Some(min) = *min
                    && text.trim().chars().count() < min
                {
                    return Err(FieldError::TooShort { min });
                }
                if let Some(max) = *max
                    && len > max
                {
                    return Err(FieldError::TooLong { max });
                }
                Ok(())
            }
            RuleKind::Email => rules::email(expect_str(value, "text")?),
            RuleKind::Tel => rules::tel(expect_str(value, "text")?),
            RuleKind::Number => rules::number(value),
            RuleKind::Integer { min, max } => rules::integer(value, *min, *max),
            RuleKind::Date => rules::date(expect_str(value, "text")?),
            RuleKind::Url => rules::url(expect_str(value, "text")?),
            RuleKind::Boolean => match value {
                Value::Bool(_) => Ok(()),
                _ => Err(FieldError::WrongType { expected: "boolean" }),
            },
            RuleKind::Choice(options) => {
                let choice = expect_str(value, "text")?;
                if options.is_empty() || options.iter().any(|o| o == choice) {
                    Ok(())
                } else {
                    Err(FieldError::NotAnOption)
                }
            }
            RuleKind::Visibility => expect_str(value, "text")?
                .parse::<Visibility>()
                .map(|_| ())
                .map_err(|_| FieldError::InvalidVisibility),
            // Nested errors are reported by Schema::validate under dotted keys.
            RuleKind::Object(_) => match value {
                Value::Object(_) => Ok(()),
                _ => Err(FieldError::WrongType { expected: "object" }),
            },
        }
    }
}

fn is_empty(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null | Value::Bool(false)) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

fn expect_str<'a>(value: &'a Value, expected: &'static str) -> Result<&'a str, FieldError> {
    value.as_str().ok_or(FieldError::WrongType { expected })
}

/// Why a single field failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum FieldError {
    #[error("This field is required")]
    Required,
    #[error("Must be at least {min} characters")]
    TooShort { min: usize },
    #[error("Must be at most {max} characters")]
    TooLong { max: usize },
    #[error("Enter a valid email address")]
    InvalidEmail,
    #[error("Enter a valid phone number")]
    InvalidPhone,
    #[error("Enter a number")]
    InvalidNumber,
    #[error("Must be a whole number between {min} and {max}")]
    OutOfRange { min: u64, max: u64 },
    #[error("Enter a date as YYYY-MM-DD")]
    InvalidDate,
    #[error("Enter a full URL starting with http:// or https://")]
    InvalidUrl,
    #[error("Choose one of the listed options")]
    NotAnOption,
    #[error("Visibility must be public, friends or private")]
    InvalidVisibility,
    #[error("Does not match {other}")]
    Mismatch { other: String },
    #[error("Expected a {expected} value")]
    WrongType { expected: &'static str },
    /// Rejected by a check spanning several fields.
    #[error("{reason}")]
    Rejected { reason: String },
}

/// Field errors keyed by field name; nested fields use `parent.child`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, FieldError>);

impl ValidationErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, error: FieldError) {
        self.0.insert(field.into(), error);
    }

    pub fn remove(&mut self, field: &str) -> Option<FieldError> {
        self.0.remove(field)
    }

    /// Drop every error for `field` and its nested children.
    pub fn clear_field(&mut self, field: &str) {
        let nested = format!("{field}.");
        self.0
            .retain(|key, _| key != field && !key.starts_with(&nested));
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&FieldError> {
        self.0.get(field)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldError)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn extend(&mut self, other: Self) {
        self.0.extend(other.0);
    }

    fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, error) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {error}")?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Ordered set of field rules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<FieldRule>,
}

impl Schema {
    #[must_use]
    pub const fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Add a rule. A rule with the same name replaces the earlier one in
    /// place and the replacement is logged.
    pub fn push(&mut self, rule: FieldRule) {
        if let Some(existing) = self.fields.iter_mut().find(|r| r.name == rule.name) {
            tracing::warn!(field = %rule.name, "duplicate form field, keeping the last definition");
            *existing = rule;
        } else {
            self.fields.push(rule);
        }
    }

    #[must_use]
    pub fn with(mut self, rule: FieldRule) -> Self {
        self.push(rule);
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldRule> {
        self.fields.iter().find(|r| r.name == name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldRule> {
        self.fields.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|r| r.name.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Starting values for every field in the schema.
    #[must_use]
    pub fn default_values(&self) -> FormValues {
        self.fields
            .iter()
            .map(|rule| (rule.name.clone(), rule.default_value()))
            .collect()
    }

    /// Validate a single field, including nested children of object fields.
    ///
    /// A name that is not in the schema always passes: it cannot be
    /// submitted either.
    ///
    /// # Errors
    ///
    /// Returns the errors for `name` (and `name.child` for nested fields).
    pub fn validate_field(&self, name: &str, values: &FormValues) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(rule) = self.get(name) {
            check_into(rule, values.get(name), name, &mut errors);
        }
        errors.into_result()
    }

    /// Validate every field of the schema.
    ///
    /// # Errors
    ///
    /// Returns all field errors when at least one field fails.
    pub fn validate(&self, values: &FormValues) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        for rule in &self.fields {
            check_into(rule, values.get(&rule.name), &rule.name, &mut errors);
        }
        errors.into_result()
    }
}

fn check_into(rule: &FieldRule, value: Option<&Value>, key: &str, errors: &mut ValidationErrors) {
    if let Err(error) = rule.check(value) {
        errors.insert(key, error);
        return;
    }
    if let (RuleKind::Object(nested), Some(Value::Object(children))) = (&rule.kind, value) {
        for child in nested.iter() {
            check_into(
                child,
                children.get(&child.name),
                &format!("{key}.{}", child.name),
                errors,
            );
        }
    }
}

impl<'a> IntoIterator for &'a Schema {
    type Item = &'a FieldRule;
    type IntoIter = std::slice::Iter<'a, FieldRule>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn values(v: Value) -> FormValues {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_required_rejects_empty_and_false() {
        let text = FieldRule::new("t", "T", RuleKind::Text { min: None, max: None }).required();
        assert_eq!(text.check(None), Err(FieldError::Required));
        assert_eq!(text.check(Some(&json!("  "))), Err(FieldError::Required));
        assert_eq!(text.check(Some(&Value::Null)), Err(FieldError::Required));

        let flag = FieldRule::new("b", "B", RuleKind::Boolean).required();
        assert_eq!(flag.check(Some(&json!(false))), Err(FieldError::Required));
        assert_eq!(flag.check(Some(&json!(true))), Ok(()));
    }

    #[test]
    fn test_optional_accepts_empty_but_checks_content() {
        let url = FieldRule::new("website", "Website", RuleKind::Url);
        assert_eq!(url.check(Some(&json!(""))), Ok(()));
        assert_eq!(url.check(None), Ok(()));
        assert_eq!(url.check(Some(&json!("not a url"))), Err(FieldError::InvalidUrl));
    }

    #[test]
    fn test_text_bounds_count_characters() {
        let rule = FieldRule::new("bio", "Bio", RuleKind::Text { min: None, max: Some(3) });
        assert_eq!(rule.check(Some(&json!("héé"))), Ok(()));
        assert_eq!(rule.check(Some(&json!("héé!"))), Err(FieldError::TooLong { max: 3 }));

        let rule = FieldRule::new("name", "Name", RuleKind::Text { min: Some(2), max: None });
        assert_eq!(rule.check(Some(&json!(" a "))), Err(FieldError::TooShort { min: 2 }));
    }

    #[test]
    fn test_wrong_type() {
        let rule = FieldRule::new("name", "Name", RuleKind::Text { min: None, max: None });
        assert_eq!(
            rule.check(Some(&json!(12))),
            Err(FieldError::WrongType { expected: "text" })
        );
    }

    #[test]
    fn test_nested_object_errors_use_dotted_keys() {
        let links = Schema::new().with(FieldRule::new("github", "GitHub", RuleKind::Url));
        let schema = Schema::new().with(FieldRule::new("links", "Links", RuleKind::Object(links)));

        let errors = schema
            .validate(&values(json!({"links": {"github": "nope"}})))
            .unwrap_err();
        assert_eq!(errors.get("links.github"), Some(&FieldError::InvalidUrl));

        assert!(schema.validate(&values(json!({"links": {}}))).is_ok());
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let schema = Schema::new();
        assert!(schema.validate(&values(json!({"anything": 1}))).is_ok());
        assert!(schema.validate_field("anything", &FormValues::new()).is_ok());
    }

    #[test]
    fn test_duplicate_push_replaces_in_place() {
        let mut schema = Schema::new()
            .with(FieldRule::new("a", "A", RuleKind::Email))
            .with(FieldRule::new("b", "B", RuleKind::Email));
        schema.push(FieldRule::new("a", "A2", RuleKind::Tel));
        let names: Vec<_> = schema.names().collect();
        assert_eq!(names, ["a", "b"]);
        assert_eq!(schema.get("a").unwrap().kind, RuleKind::Tel);
    }

    #[test]
    fn test_clear_field_removes_nested() {
        let mut errors = ValidationErrors::new();
        errors.insert("links", FieldError::Required);
        errors.insert("links.github", FieldError::InvalidUrl);
        errors.insert("linksy", FieldError::Required);
        errors.clear_field("links");
        assert_eq!(errors.len(), 1);
        assert!(errors.get("linksy").is_some());
    }

    #[test]
    fn test_errors_display() {
        let mut errors = ValidationErrors::new();
        errors.insert("b", FieldError::Required);
        errors.insert("a", FieldError::InvalidEmail);
        assert_eq!(
            errors.to_string(),
            "a: Enter a valid email address; b: This field is required"
        );
    }
}
