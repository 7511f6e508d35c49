//! Pure format rules. No I/O, no clock: callers pass `today` in.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

pub const NAME_MIN_CHARS: usize = 2;
pub const NAME_MAX_CHARS: usize = 100;
pub const EMAIL_MAX_CHARS: usize = 254;
pub const TEXT_MAX_CHARS: usize = 100;

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("Invalid regex pattern"));
static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\p{L} '\-]+$").expect("Invalid regex pattern"));
static COUNTRY_CODE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+\d{1,4}$").expect("Invalid regex pattern"));

#[must_use]
pub fn is_valid_email(value: &str) -> bool {
    let value = value.trim();
    value.chars().count() <= EMAIL_MAX_CHARS && EMAIL_PATTERN.is_match(value)
}

/// Letters, spaces, hyphens and apostrophes; 2 to 100 characters.
#[must_use]
pub fn is_valid_name(value: &str) -> bool {
    let value = value.trim();
    let len = value.chars().count();
    (NAME_MIN_CHARS..=NAME_MAX_CHARS).contains(&len) && NAME_PATTERN.is_match(value)
}

#[must_use]
pub fn is_valid_country_code(value: &str) -> bool {
    COUNTRY_CODE_PATTERN.is_match(value.trim())
}

#[must_use]
pub fn fits_text_limit(value: &str) -> bool {
    value.trim().chars().count() <= TEXT_MAX_CHARS
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateCheck {
    Valid(NaiveDate),
    Malformed,
    InPast,
}

/// Parses an ISO-8601 calendar date and rejects days before `today`.
#[must_use]
pub fn check_preferred_date(value: &str, today: NaiveDate) -> DateCheck {
    match NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d") {
        Ok(date) if date < today => DateCheck::InPast,
        Ok(date) => DateCheck::Valid(date),
        Err(_) => DateCheck::Malformed,
    }
}

/// Splits a full name into first name and the remainder.
#[must_use]
pub fn split_name(full: &str) -> (String, String) {
    let mut parts = full.split_whitespace();
    let first = parts.next().unwrap_or_default().to_string();
    let rest = parts.collect::<Vec<_>>().join(" ");
    (first, rest)
}
