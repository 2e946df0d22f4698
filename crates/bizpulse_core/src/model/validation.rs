//! Write-path field validation shared by all domain records.
//!
//! # Responsibility
//! - Hold the field limits applied before any record is persisted.
//! - Report the first violated rule as a typed error.
//!
//! # Invariants
//! - Validation is pure: it never mutates the record it checks.
//! - Text limits are counted in chars, not bytes.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const NAME_MAX: usize = 100;
pub const COMPANY_MAX: usize = 100;
pub const EMAIL_MAX: usize = 255;
pub const PHONE_MAX: usize = 20;
pub const NOTES_MAX: usize = 1000;
pub const DESCRIPTION_MAX: usize = 500;
pub const SHORT_TEXT_MAX: usize = 50;
pub const SPACE_LABEL_MAX: usize = 50;
pub const VALUE_MAX: f64 = 999_999_999.0;
pub const NPS_MAX: u8 = 10;

static PHONE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\d\s\-()+]{8,20}$").expect("phone pattern is valid"));
static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"));

/// Field-level validation failure.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Required text is blank after trim.
    Required(&'static str),
    /// Text exceeds its char limit.
    TooLong { field: &'static str, max: usize },
    /// Email does not look like `local@domain.tld`.
    InvalidEmail(String),
    /// Phone contains unsupported characters or has the wrong length.
    InvalidPhone(String),
    /// Numeric field is NaN or infinite.
    NonFinite(&'static str),
    /// Numeric field is outside its accepted range.
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    /// NPS score above 10.
    InvalidScore(u8),
    /// `end_date` precedes `start_date`.
    ReversedDateRange,
    /// Nil UUID used as an identity.
    NilId(&'static str),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Required(field) => write!(f, "{field} is required"),
            Self::TooLong { field, max } => {
                write!(f, "{field} must be at most {max} characters")
            }
            Self::InvalidEmail(value) => write!(f, "invalid email `{value}`"),
            Self::InvalidPhone(value) => write!(f, "invalid phone `{value}`"),
            Self::NonFinite(field) => write!(f, "{field} must be a finite number"),
            Self::OutOfRange {
                field,
                value,
                min,
                max,
            } => write!(f, "{field} = {value} is outside [{min}, {max}]"),
            Self::InvalidScore(score) => {
                write!(f, "nps score {score} is outside [0, {NPS_MAX}]")
            }
            Self::ReversedDateRange => write!(f, "end_date must not be earlier than start_date"),
            Self::NilId(field) => write!(f, "{field} must not be nil"),
        }
    }
}

impl Error for ValidationError {}

pub type ValidationResult = Result<(), ValidationError>;

pub(crate) fn required_text(field: &'static str, value: &str, max: usize) -> ValidationResult {
    if value.trim().is_empty() {
        return Err(ValidationError::Required(field));
    }
    max_len(field, value, max)
}

pub(crate) fn max_len(field: &'static str, value: &str, max: usize) -> ValidationResult {
    if value.trim().chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(())
}

pub(crate) fn optional_text(field: &'static str, value: Option<&str>, max: usize) -> ValidationResult {
    match value {
        Some(value) => max_len(field, value, max),
        None => Ok(()),
    }
}

pub(crate) fn optional_email(value: Option<&str>) -> ValidationResult {
    let Some(value) = value.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(());
    };
    max_len("email", value, EMAIL_MAX)?;
    if !EMAIL_PATTERN.is_match(value) {
        return Err(ValidationError::InvalidEmail(value.to_string()));
    }
    Ok(())
}

/// Checks length only; `strict` additionally enforces the phone pattern.
pub(crate) fn optional_phone(value: Option<&str>, strict: bool) -> ValidationResult {
    let Some(value) = value.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(());
    };
    max_len("phone", value, PHONE_MAX)?;
    if strict && !PHONE_PATTERN.is_match(value) {
        return Err(ValidationError::InvalidPhone(value.to_string()));
    }
    Ok(())
}

pub(crate) fn finite_in_range(field: &'static str, value: f64, min: f64, max: f64) -> ValidationResult {
    if !value.is_finite() {
        return Err(ValidationError::NonFinite(field));
    }
    if value < min || value > max {
        return Err(ValidationError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}

pub(crate) fn optional_money(field: &'static str, value: Option<f64>) -> ValidationResult {
    match value {
        Some(value) => finite_in_range(field, value, 0.0, VALUE_MAX),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_text_rejects_blank_and_long_values() {
        assert_eq!(
            required_text("name", "   ", NAME_MAX),
            Err(ValidationError::Required("name"))
        );
        let long = "x".repeat(NAME_MAX + 1);
        assert_eq!(
            required_text("name", &long, NAME_MAX),
            Err(ValidationError::TooLong {
                field: "name",
                max: NAME_MAX
            })
        );
        assert!(required_text("name", "  Acme  ", NAME_MAX).is_ok());
    }

    #[test]
    fn email_and_phone_patterns() {
        assert!(optional_email(Some("ana@acme.com.br")).is_ok());
        assert!(optional_email(Some("")).is_ok());
        assert!(matches!(
            optional_email(Some("not-an-email")),
            Err(ValidationError::InvalidEmail(_))
        ));

        assert!(optional_phone(Some("+55 (11) 99999-0000"), true).is_ok());
        assert!(matches!(
            optional_phone(Some("call me"), true),
            Err(ValidationError::InvalidPhone(_))
        ));
        assert!(optional_phone(Some("call me"), false).is_ok());
    }

    #[test]
    fn finite_in_range_rejects_nan_and_bounds() {
        assert_eq!(
            finite_in_range("value", f64::NAN, 0.0, 1.0),
            Err(ValidationError::NonFinite("value"))
        );
        assert!(finite_in_range("value", -1.0, 0.0, 1.0).is_err());
        assert!(finite_in_range("value", VALUE_MAX, 0.0, VALUE_MAX).is_ok());
    }
}
