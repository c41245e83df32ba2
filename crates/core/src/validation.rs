//! Input validation utilities.
//!
//! This module contains functions for validating user inputs before they reach the database.
//! Services call these at the start of every mutating operation so that rejected input never
//! leaves partial state behind.

use crate::constants::{BLOOD_TYPES, MAX_NAME_LEN, MAX_NOTE_LEN, MIN_PASSWORD_LEN};
use crate::{ClinicError, ClinicResult};
use chrono::NaiveDate;
use clinic_types::{EmailAddress, NonEmptyText};

/// Validates a person's or label's name and returns it trimmed.
pub fn name(field: &str, value: &str) -> ClinicResult<String> {
    NonEmptyText::bounded(value, MAX_NAME_LEN)
        .map(NonEmptyText::into_inner)
        .map_err(|e| ClinicError::invalid(format!("{field}: {e}")))
}

/// Normalises an optional free-text field: blank becomes `None`, long text is rejected.
pub fn optional_text(field: &str, value: Option<String>) -> ClinicResult<Option<String>> {
    match value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) if v.chars().count() > MAX_NOTE_LEN => Err(ClinicError::invalid(format!(
            "{field} exceeds maximum length of {MAX_NOTE_LEN} characters"
        ))),
        Some(v) => Ok(Some(v)),
    }
}

/// Validates a required free-text field.
pub fn required_text(field: &str, value: &str) -> ClinicResult<String> {
    optional_text(field, Some(value.to_string()))?
        .ok_or_else(|| ClinicError::invalid(format!("{field} is required")))
}

/// Validates a national identifier: 4-20 characters, ASCII alphanumeric or `-`.
///
/// Returned uppercase so uniqueness is case-insensitive.
pub fn national_id(value: &str) -> ClinicResult<String> {
    let value = value.trim();
    if !(4..=20).contains(&value.len()) {
        return Err(ClinicError::invalid(
            "national_id must be between 4 and 20 characters",
        ));
    }
    if !value.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-') {
        return Err(ClinicError::invalid(
            "national_id contains invalid characters (only alphanumeric and '-' allowed)",
        ));
    }
    Ok(value.to_ascii_uppercase())
}

/// Validates a birth date against `today`.
pub fn birth_date(value: NaiveDate, today: NaiveDate) -> ClinicResult<NaiveDate> {
    let earliest = NaiveDate::from_ymd_opt(1900, 1, 1).unwrap_or(NaiveDate::MIN);
    if value > today {
        return Err(ClinicError::invalid("birth_date cannot be in the future"));
    }
    if value < earliest {
        return Err(ClinicError::invalid("birth_date cannot be before 1900-01-01"));
    }
    Ok(value)
}

pub fn optional_email(value: Option<String>) -> ClinicResult<Option<String>> {
    match value.filter(|v| !v.trim().is_empty()) {
        None => Ok(None),
        Some(v) => email(&v).map(Some),
    }
}

pub fn email(value: &str) -> ClinicResult<String> {
    EmailAddress::parse(value)
        .map(|e| e.as_str().to_string())
        .map_err(|e| ClinicError::invalid(format!("email: {e}")))
}

/// Validates an optional phone number: digits, spaces and `+-()` only, 6-20 characters.
pub fn optional_phone(value: Option<String>) -> ClinicResult<Option<String>> {
    let Some(phone) = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    let ok_chars = phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '+' | '-' | '(' | ')'));
    let digits = phone.chars().filter(char::is_ascii_digit).count();
    if !ok_chars || !(6..=20).contains(&digits) {
        return Err(ClinicError::invalid(format!("invalid phone number '{phone}'")));
    }
    Ok(Some(phone))
}

pub fn optional_blood_type(value: Option<String>) -> ClinicResult<Option<String>> {
    let Some(blood) = value
        .map(|v| v.trim().to_ascii_uppercase())
        .filter(|v| !v.is_empty())
    else {
        return Ok(None);
    };
    if !BLOOD_TYPES.contains(&blood.as_str()) {
        return Err(ClinicError::invalid(format!("invalid blood type '{blood}'")));
    }
    Ok(Some(blood))
}

pub fn password(value: &str) -> ClinicResult<()> {
    if value.chars().count() < MIN_PASSWORD_LEN {
        return Err(ClinicError::invalid(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Validates a role name: lowercase ASCII letters, digits and `_`, starting with a letter.
pub fn role_name(value: &str) -> ClinicResult<String> {
    let value = value.trim();
    let valid = !value.is_empty()
        && value.len() <= 50
        && value.starts_with(|c: char| c.is_ascii_lowercase())
        && value
            .bytes()
            .all(|b| matches!(b, b'a'..=b'z' | b'0'..=b'9' | b'_'));
    if !valid {
        return Err(ClinicError::invalid(
            "role name must be lowercase snake_case (letters, digits, '_')",
        ));
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn national_id_is_uppercased() {
        assert_eq!(national_id(" ab-1234 ").unwrap(), "AB-1234");
        assert!(national_id("abc").is_err());
        assert!(national_id("ab 1234").is_err());
    }

    #[test]
    fn birth_date_bounds() {
        let today = date("2026-10-19");
        assert!(birth_date(date("1980-02-29"), today).is_ok());
        assert!(birth_date(date("2026-10-20"), today).is_err());
        assert!(birth_date(date("1899-12-31"), today).is_err());
    }

    #[test]
    fn blank_optional_fields_become_none() {
        assert_eq!(optional_text("notes", Some("   ".into())).unwrap(), None);
        assert_eq!(optional_email(Some("".into())).unwrap(), None);
        assert_eq!(optional_phone(None).unwrap(), None);
    }

    #[test]
    fn blood_type_is_normalised() {
        assert_eq!(optional_blood_type(Some("ab+".into())).unwrap(), Some("AB+".into()));
        assert!(optional_blood_type(Some("C+".into())).is_err());
    }

    #[test]
    fn phone_requires_enough_digits() {
        assert!(optional_phone(Some("+44 (20) 7946-0018".into())).unwrap().is_some());
        assert!(optional_phone(Some("12345".into())).is_err());
        assert!(optional_phone(Some("call me".into())).is_err());
    }

    #[test]
    fn role_names_are_snake_case() {
        assert_eq!(role_name("nurse_lead").unwrap(), "nurse_lead");
        assert!(role_name("Nurse").is_err());
        assert!(role_name("1nurse").is_err());
    }

    #[test]
    fn short_passwords_rejected() {
        assert!(password("short").is_err());
        assert!(password("long-enough").is_ok());
    }
}
