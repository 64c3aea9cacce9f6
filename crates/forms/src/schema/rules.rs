//! Content checks for the non-text rule kinds.

use std::str::FromStr;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;
use serde_json::Value;
use url::Url;

use hearth_core::Email;

use super::FieldError;

/// Digits, spaces, dots, dashes and parentheses with an optional leading `+`.
static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9(](?:[0-9 ().-]*[0-9])?$").expect("Invalid regex"));

const PHONE_MIN_DIGITS: usize = 7;
const PHONE_MAX_DIGITS: usize = 15;

pub(super) fn email(value: &str) -> Result<(), FieldError> {
    Email::parse(value)
        .map(|_| ())
        .map_err(|_| FieldError::InvalidEmail)
}

pub(super) fn tel(value: &str) -> Result<(), FieldError> {
    let value = value.trim();
    if !PHONE_RE.is_match(value) {
        return Err(FieldError::InvalidPhone);
    }
    let digits = value.chars().filter(char::is_ascii_digit).count();
    if (PHONE_MIN_DIGITS..=PHONE_MAX_DIGITS).contains(&digits) {
        Ok(())
    } else {
        Err(FieldError::InvalidPhone)
    }
}

pub(super) fn number(value: &Value) -> Result<(), FieldError> {
    match value {
        Value::Number(_) => Ok(()),
        Value::String(s) => Decimal::from_str(s.trim())
            .or_else(|_| Decimal::from_scientific(s.trim()))
            .map(|_| ())
            .map_err(|_| FieldError::InvalidNumber),
        _ => Err(FieldError::InvalidNumber),
    }
}

pub(super) fn integer(value: &Value, min: u64, max: u64) -> Result<(), FieldError> {
    let out_of_range = FieldError::OutOfRange { min, max };
    let n = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
    .ok_or_else(|| out_of_range.clone())?;
    if (min..=max).contains(&n) {
        Ok(())
    } else {
        Err(out_of_range)
    }
}

pub(super) fn date(value: &str) -> Result<(), FieldError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| FieldError::InvalidDate)
}

pub(super) fn url(value: &str) -> Result<(), FieldError> {
    match Url::parse(value.trim()) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.host().is_some() => Ok(()),
        _ => Err(FieldError::InvalidUrl),
    }
}
