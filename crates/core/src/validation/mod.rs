//! Field validation for the booking form.
//!
//! Every field has exactly one rule. Rules are synchronous and side-effect
//! free; the only inputs beyond the form data are the clock's current day and
//! the injected phone check.

pub mod phone;
pub mod rules;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::form::FormSession;
use crate::model::step::{self, StepDefinition};
use crate::model::{AgeBracket, Field, SessionDuration, TimeSlot};
use crate::time::Clock;

use phone::{DEFAULT_COUNTRY_CODE, LibPhoneCheck, PhoneNumberCheck, is_valid_mobile};
use rules::DateCheck;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ErrorCode {
    Required,
    InvalidEmail,
    InvalidPhone,
    InvalidName,
    InvalidFormat,
    InvalidDate,
    PastDate,
    InvalidOption,
    TooLong,
    StaleValue,
}

impl ErrorCode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Required => "required",
            ErrorCode::InvalidEmail => "invalid_email",
            ErrorCode::InvalidPhone => "invalid_phone",
            ErrorCode::InvalidName => "invalid_name",
            ErrorCode::InvalidFormat => "invalid_format",
            ErrorCode::InvalidDate => "invalid_date",
            ErrorCode::PastDate => "past_date",
            ErrorCode::InvalidOption => "invalid_option",
            ErrorCode::TooLong => "too_long",
            ErrorCode::StaleValue => "stale_value",
        }
    }
}

/// A single user-facing problem with one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub field: Field,
    pub message: String,
    pub code: ErrorCode,
}

impl ValidationError {
    #[must_use]
    pub fn new(field: Field, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
            code,
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Per-field errors, at most one per field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<Field, ValidationError>);

impl FieldErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, error: ValidationError) {
        self.0.insert(error.field, error);
    }

    pub fn remove(&mut self, field: Field) -> Option<ValidationError> {
        self.0.remove(&field)
    }

    #[must_use]
    pub fn get(&self, field: Field) -> Option<&ValidationError> {
        self.0.get(&field)
    }

    #[must_use]
    pub fn message(&self, field: Field) -> Option<&str> {
        self.0.get(&field).map(|e| e.message.as_str())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.values()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<ValidationError> {
        self.0.into_values().collect()
    }
}

impl FromIterator<ValidationError> for FieldErrors {
    fn from_iter<I: IntoIterator<Item = ValidationError>>(iter: I) -> Self {
        let mut errors = Self::new();
        for error in iter {
            errors.insert(error);
        }
        errors
    }
}

//
// ─── VALIDATOR ─────────────────────────────────────────────────────────────────
//

/// Applies the per-field rules to a session.
#[derive(Clone)]
pub struct Validator {
    clock: Clock,
    phone: Arc<dyn PhoneNumberCheck>,
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(Clock::default())
    }
}

impl Validator {
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self {
            clock,
            phone: Arc::new(LibPhoneCheck),
        }
    }

    #[must_use]
    pub fn with_phone_check(mut self, phone: Arc<dyn PhoneNumberCheck>) -> Self {
        self.phone = phone;
        self
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    /// Validates the fields owned by `def`, returning at most one error each.
    #[must_use]
    pub fn validate_step(&self, session: &FormSession, def: &StepDefinition) -> FieldErrors {
        def.fields
            .iter()
            .filter_map(|&field| self.validate_field(session, field, def.is_required(field)))
            .collect()
    }

    /// Re-validates the whole active path right before submission.
    ///
    /// Also reports values still held by fields of the inactive branch.
    #[must_use]
    pub fn validate_all(&self, session: &FormSession) -> Vec<ValidationError> {
        let bracket = session.bracket();
        let mut errors = FieldErrors::new();
        for def in step::path(bracket) {
            for error in self.validate_step(session, def).into_vec() {
                errors.insert(error);
            }
        }
        if let Some(bracket) = bracket {
            for field in session.data().fields() {
                if field.branch() == Some(bracket.other()) && session.data().is_set(field) {
                    errors.insert(ValidationError::new(
                        field,
                        ErrorCode::StaleValue,
                        "This answer belongs to a different age group; please clear it",
                    ));
                }
            }
        }
        errors.into_vec()
    }

    /// Runs the one rule for `field`.
    #[must_use]
    pub fn validate_field(
        &self,
        session: &FormSession,
        field: Field,
        required: bool,
    ) -> Option<ValidationError> {
        let data = session.data();
        match field {
            Field::IsStudentUnder16 => session.bracket().is_none().then(|| {
                ValidationError::new(
                    field,
                    ErrorCode::Required,
                    "Please tell us whether the student is under 16",
                )
            }),
            Field::ParentName => name_rule(field, data.text(field), required, "Parent name"),
            Field::StudentName => name_rule(field, data.text(field), required, "Student name"),
            Field::ParentEmail | Field::StudentEmail => match data.text(field) {
                None if required => Some(ValidationError::new(
                    field,
                    ErrorCode::Required,
                    "Valid email is required",
                )),
                Some(value) if !rules::is_valid_email(value) => Some(ValidationError::new(
                    field,
                    ErrorCode::InvalidEmail,
                    "Valid email is required",
                )),
                _ => None,
            },
            Field::ParentCountryCode | Field::StudentCountryCode => data
                .text(field)
                .filter(|code| !rules::is_valid_country_code(code))
                .map(|_| {
                    ValidationError::new(
                        field,
                        ErrorCode::InvalidFormat,
                        "Country code must look like +91",
                    )
                }),
            Field::ParentPhone | Field::StudentPhone => {
                let code_field = if field == Field::ParentPhone {
                    Field::ParentCountryCode
                } else {
                    Field::StudentCountryCode
                };
                let country_code = data.text(code_field).unwrap_or(DEFAULT_COUNTRY_CODE);
                match data.text(field) {
                    None if required => Some(ValidationError::new(
                        field,
                        ErrorCode::Required,
                        "Valid mobile number is required",
                    )),
                    Some(number) if !is_valid_mobile(self.phone.as_ref(), country_code, number) => {
                        Some(ValidationError::new(
                            field,
                            ErrorCode::InvalidPhone,
                            "Valid mobile number is required",
                        ))
                    }
                    _ => None,
                }
            }
            Field::City | Field::StudentGrade => {
                let label = if field == Field::City {
                    "City"
                } else {
                    "Student grade"
                };
                text_rule(field, data.text(field), required, label)
            }
            Field::ParentRelationship
            | Field::SchoolName
            | Field::InstitutionName
            | Field::Country
            | Field::Timezone => text_rule(field, data.text(field), required, "This answer"),
            Field::PreferredCourses => {
                let selected = data.list(field);
                if selected.is_empty() {
                    return required.then(|| {
                        ValidationError::new(
                            field,
                            ErrorCode::Required,
                            "Please select at least one course",
                        )
                    });
                }
                let courses = session.course_options();
                selected
                    .into_iter()
                    .find(|title| !courses.accepts(title))
                    .map(|title| {
                        ValidationError::new(
                            field,
                            ErrorCode::InvalidOption,
                            format!("Unknown course: {title}"),
                        )
                    })
            }
            Field::PreferredDate => match data.text(field) {
                None => required.then(|| {
                    ValidationError::new(field, ErrorCode::Required, "Preferred date is required")
                }),
                Some(value) => match rules::check_preferred_date(value, self.clock.today()) {
                    DateCheck::Valid(_) => None,
                    DateCheck::Malformed => Some(ValidationError::new(
                        field,
                        ErrorCode::InvalidDate,
                        "Preferred date must be a valid date (YYYY-MM-DD)",
                    )),
                    DateCheck::InPast => Some(ValidationError::new(
                        field,
                        ErrorCode::PastDate,
                        "Preferred date cannot be in the past",
                    )),
                },
            },
            Field::PreferredTimeSlot => option_rule::<TimeSlot>(
                field,
                data.text(field),
                required,
                "Please choose a valid time slot",
            ),
            Field::SessionDuration => option_rule::<SessionDuration>(
                field,
                data.text(field),
                required,
                "Please choose a valid session duration",
            ),
            Field::TermsAndPrivacy => (required && !data.flag(field)).then(|| {
                ValidationError::new(
                    field,
                    ErrorCode::Required,
                    "You must accept the terms and privacy policy",
                )
            }),
            Field::ParentConsent => (required && !data.flag(field)).then(|| {
                ValidationError::new(
                    field,
                    ErrorCode::Required,
                    "Parent or guardian consent is required",
                )
            }),
            // Independent yes/no answers; studying and working may both be true.
            Field::CurrentlyStudying
            | Field::CurrentlyWorking
            | Field::PreviousDemoAttended
            | Field::MarketingConsent
            | Field::MarketingEmail
            | Field::MarketingSms
            | Field::MarketingWhatsapp => None,
        }
    }
}

fn name_rule(
    field: Field,
    value: Option<&str>,
    required: bool,
    label: &str,
) -> Option<ValidationError> {
    match value {
        None => required.then(|| {
            ValidationError::new(field, ErrorCode::Required, format!("{label} is required"))
        }),
        Some(name) if !rules::is_valid_name(name) => Some(ValidationError::new(
            field,
            ErrorCode::InvalidName,
            format!("{label} must be 2-100 letters, spaces, hyphens or apostrophes"),
        )),
        Some(_) => None,
    }
}

fn text_rule(
    field: Field,
    value: Option<&str>,
    required: bool,
    label: &str,
) -> Option<ValidationError> {
    match value {
        None => required.then(|| {
            ValidationError::new(field, ErrorCode::Required, format!("{label} is required"))
        }),
        Some(text) if !rules::fits_text_limit(text) => Some(ValidationError::new(
            field,
            ErrorCode::TooLong,
            format!(
                "{label} must be at most {} characters",
                rules::TEXT_MAX_CHARS
            ),
        )),
        Some(_) => None,
    }
}

fn option_rule<T: std::str::FromStr>(
    field: Field,
    value: Option<&str>,
    required: bool,
    message: &str,
) -> Option<ValidationError> {
    match value {
        None => required.then(|| ValidationError::new(field, ErrorCode::Required, message)),
        Some(raw) if raw.parse::<T>().is_err() => {
            Some(ValidationError::new(field, ErrorCode::InvalidOption, message))
        }
        Some(_) => None,
    }
}

/// True when `field` may hold a value for a session on `bracket`.
#[must_use]
pub fn field_is_active(field: Field, bracket: Option<AgeBracket>) -> bool {
    match (field.branch(), bracket) {
        (None, _) | (_, None) => true,
        (Some(owner), Some(active)) => owner == active,
    }
}
