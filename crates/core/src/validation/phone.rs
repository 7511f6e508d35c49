//! Mobile number checks.
//!
//! A libphonenumber-backed numbering-plan check is tried first. When it cannot judge the country
//! (`PhoneCheckError`), the hand-maintained fallback table decides instead.

use thiserror::Error;

pub const DEFAULT_COUNTRY_CODE: &str = "+91";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PhoneCheckError {
    #[error("no numbering plan for country code {0}")]
    UnsupportedRegion(String),
}

/// Numbering-plan lookup used before the fallback table.
pub trait PhoneNumberCheck: Send + Sync {
    /// Returns whether `national_number` (digits only) is a valid mobile
    /// number for `country_code`.
    ///
    /// # Errors
    ///
    /// Returns `PhoneCheckError` when the check cannot judge this country.
    fn check(&self, country_code: &str, national_number: &str) -> Result<bool, PhoneCheckError>;
}

/// Numbering-plan check backed by libphonenumber metadata.
#[derive(Debug, Clone, Copy, Default)]
pub struct LibPhoneCheck;

impl PhoneNumberCheck for LibPhoneCheck {
    fn check(&self, country_code: &str, national_number: &str) -> Result<bool, PhoneCheckError> {
        let unsupported = || PhoneCheckError::UnsupportedRegion(country_code.to_string());
        let number = phonenumber::parse(None, format!("{country_code}{national_number}"))
            .map_err(|_| unsupported())?;
        if number.country().id().is_none() {
            return Err(unsupported());
        }
        if !phonenumber::is_valid(&number) {
            return Ok(false);
        }
        Ok(matches!(
            number.number_type(&phonenumber::metadata::DATABASE),
            phonenumber::Type::Mobile | phonenumber::Type::FixedLineOrMobile
        ))
    }
}

struct FallbackRule {
    country_code: &'static str,
    min_len: usize,
    max_len: usize,
    leading_digits: &'static str,
}

const FALLBACK_RULES: &[FallbackRule] = &[
    FallbackRule {
        country_code: "+91",
        min_len: 10,
        max_len: 10,
        leading_digits: "6789",
    },
    FallbackRule {
        country_code: "+1",
        min_len: 10,
        max_len: 10,
        leading_digits: "23456789",
    },
    FallbackRule {
        country_code: "+44",
        min_len: 10,
        max_len: 10,
        leading_digits: "7",
    },
    FallbackRule {
        country_code: "+61",
        min_len: 9,
        max_len: 9,
        leading_digits: "4",
    },
    FallbackRule {
        country_code: "+65",
        min_len: 8,
        max_len: 8,
        leading_digits: "89",
    },
    FallbackRule {
        country_code: "+971",
        min_len: 9,
        max_len: 9,
        leading_digits: "5",
    },
    FallbackRule {
        country_code: "+966",
        min_len: 9,
        max_len: 9,
        leading_digits: "5",
    },
    FallbackRule {
        country_code: "+974",
        min_len: 8,
        max_len: 8,
        leading_digits: "3567",
    },
    FallbackRule {
        country_code: "+977",
        min_len: 10,
        max_len: 10,
        leading_digits: "9",
    },
    FallbackRule {
        country_code: "+880",
        min_len: 10,
        max_len: 10,
        leading_digits: "1",
    },
    FallbackRule {
        country_code: "+94",
        min_len: 9,
        max_len: 9,
        leading_digits: "7",
    },
    FallbackRule {
        country_code: "+49",
        min_len: 10,
        max_len: 11,
        leading_digits: "1",
    },
];

// E.164 bounds for countries missing from the table.
const GENERIC_MIN_LEN: usize = 7;
const GENERIC_MAX_LEN: usize = 15;

fn fallback_check(country_code: &str, digits: &str) -> bool {
    match FALLBACK_RULES.iter().find(|r| r.country_code == country_code) {
        Some(rule) => {
            (rule.min_len..=rule.max_len).contains(&digits.len())
                && digits
                    .chars()
                    .next()
                    .is_some_and(|c| rule.leading_digits.contains(c))
        }
        None => (GENERIC_MIN_LEN..=GENERIC_MAX_LEN).contains(&digits.len()),
    }
}

/// Strips the separators people type into phone inputs.
///
/// Returns `None` if anything other than digits and separators remains.
#[must_use]
pub fn normalize_number(raw: &str) -> Option<String> {
    let mut digits = String::with_capacity(raw.len());
    for c in raw.trim().chars() {
        match c {
            '0'..='9' => digits.push(c),
            ' ' | '-' | '.' | '(' | ')' => {}
            _ => return None,
        }
    }
    (!digits.is_empty()).then_some(digits)
}

/// Validates a mobile number against `checker`, falling back to the table.
#[must_use]
pub fn is_valid_mobile(checker: &dyn PhoneNumberCheck, country_code: &str, raw: &str) -> bool {
    let Some(digits) = normalize_number(raw) else {
        return false;
    };
    match checker.check(country_code, &digits) {
        Ok(valid) => valid,
        Err(PhoneCheckError::UnsupportedRegion(_)) => fallback_check(country_code, &digits),
    }
}
