use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::step::AgeBracket;

//
// ─── FIELD NAMES ───────────────────────────────────────────────────────────────
//

/// Closed set of logical field names collected by the booking form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    #[serde(rename = "isStudentUnder16")]
    IsStudentUnder16,

    ParentName,
    ParentEmail,
    ParentCountryCode,
    ParentPhone,
    ParentRelationship,

    StudentName,
    StudentEmail,
    StudentCountryCode,
    StudentPhone,
    StudentGrade,
    SchoolName,
    CurrentlyStudying,
    CurrentlyWorking,
    InstitutionName,
    PreferredCourses,

    City,
    Country,

    PreferredDate,
    PreferredTimeSlot,
    Timezone,
    #[serde(rename = "sessionDurationPreference")]
    SessionDuration,
    PreviousDemoAttended,

    TermsAndPrivacy,
    ParentConsent,
    MarketingConsent,
    MarketingEmail,
    MarketingSms,
    MarketingWhatsapp,
}

/// Shape of the value a field holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Flag,
    List,
}

impl Field {
    pub const ALL: [Field; 29] = [
        Field::IsStudentUnder16,
        Field::ParentName,
        Field::ParentEmail,
        Field::ParentCountryCode,
        Field::ParentPhone,
        Field::ParentRelationship,
        Field::StudentName,
        Field::StudentEmail,
        Field::StudentCountryCode,
        Field::StudentPhone,
        Field::StudentGrade,
        Field::SchoolName,
        Field::CurrentlyStudying,
        Field::CurrentlyWorking,
        Field::InstitutionName,
        Field::PreferredCourses,
        Field::City,
        Field::Country,
        Field::PreferredDate,
        Field::PreferredTimeSlot,
        Field::Timezone,
        Field::SessionDuration,
        Field::PreviousDemoAttended,
        Field::TermsAndPrivacy,
        Field::ParentConsent,
        Field::MarketingConsent,
        Field::MarketingEmail,
        Field::MarketingSms,
        Field::MarketingWhatsapp,
    ];

    /// Wire name used in error maps and answer files.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Field::IsStudentUnder16 => "isStudentUnder16",
            Field::ParentName => "parentName",
            Field::ParentEmail => "parentEmail",
            Field::ParentCountryCode => "parentCountryCode",
            Field::ParentPhone => "parentPhone",
            Field::ParentRelationship => "parentRelationship",
            Field::StudentName => "studentName",
            Field::StudentEmail => "studentEmail",
            Field::StudentCountryCode => "studentCountryCode",
            Field::StudentPhone => "studentPhone",
            Field::StudentGrade => "studentGrade",
            Field::SchoolName => "schoolName",
            Field::CurrentlyStudying => "currentlyStudying",
            Field::CurrentlyWorking => "currentlyWorking",
            Field::InstitutionName => "institutionName",
            Field::PreferredCourses => "preferredCourses",
            Field::City => "city",
            Field::Country => "country",
            Field::PreferredDate => "preferredDate",
            Field::PreferredTimeSlot => "preferredTimeSlot",
            Field::Timezone => "timezone",
            Field::SessionDuration => "sessionDurationPreference",
            Field::PreviousDemoAttended => "previousDemoAttended",
            Field::TermsAndPrivacy => "termsAndPrivacy",
            Field::ParentConsent => "parentConsent",
            Field::MarketingConsent => "marketingConsent",
            Field::MarketingEmail => "marketingEmail",
            Field::MarketingSms => "marketingSms",
            Field::MarketingWhatsapp => "marketingWhatsapp",
        }
    }

    #[must_use]
    pub fn kind(self) -> FieldKind {
        match self {
            Field::IsStudentUnder16
            | Field::CurrentlyStudying
            | Field::CurrentlyWorking
            | Field::PreviousDemoAttended
            | Field::TermsAndPrivacy
            | Field::ParentConsent
            | Field::MarketingConsent
            | Field::MarketingEmail
            | Field::MarketingSms
            | Field::MarketingWhatsapp => FieldKind::Flag,
            Field::PreferredCourses => FieldKind::List,
            _ => FieldKind::Text,
        }
    }

    /// Branch that owns this field, or `None` when both paths collect it.
    #[must_use]
    pub fn branch(self) -> Option<AgeBracket> {
        match self {
            Field::ParentName
            | Field::ParentEmail
            | Field::ParentCountryCode
            | Field::ParentPhone
            | Field::ParentRelationship
            | Field::StudentGrade
            | Field::SchoolName
            | Field::ParentConsent => Some(AgeBracket::Under16),
            Field::StudentEmail
            | Field::StudentCountryCode
            | Field::StudentPhone
            | Field::CurrentlyStudying
            | Field::CurrentlyWorking
            | Field::InstitutionName => Some(AgeBracket::SixteenPlus),
            _ => None,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown form field: {0}")]
pub struct UnknownFieldError(pub String);

impl FromStr for Field {
    type Err = UnknownFieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| UnknownFieldError(s.to_string()))
    }
}

//
// ─── VALUES ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Flag(bool),
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    #[must_use]
    pub fn list<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::List(values.into_iter().map(Into::into).collect())
    }

    #[must_use]
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Flag(_) => FieldKind::Flag,
            FieldValue::Text(_) => FieldKind::Text,
            FieldValue::List(_) => FieldKind::List,
        }
    }

    /// True when the value carries nothing the user entered.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Flag(b) => !b,
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::List(items) => items.iter().all(|s| s.trim().is_empty()),
        }
    }
}

//
// ─── FORM DATA ─────────────────────────────────────────────────────────────────
//

/// Field-value map for one booking session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    values: BTreeMap<Field, FieldValue>,
}

impl FormData {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, field: Field, value: FieldValue) {
        self.values.insert(field, value);
    }

    pub(crate) fn remove(&mut self, field: Field) -> Option<FieldValue> {
        self.values.remove(&field)
    }

    #[must_use]
    pub fn get(&self, field: Field) -> Option<&FieldValue> {
        self.values.get(&field)
    }

    /// Trimmed text value, `None` when missing or blank.
    #[must_use]
    pub fn text(&self, field: Field) -> Option<&str> {
        match self.values.get(&field) {
            Some(FieldValue::Text(s)) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then_some(trimmed)
            }
            _ => None,
        }
    }

    #[must_use]
    pub fn flag(&self, field: Field) -> bool {
        matches!(self.values.get(&field), Some(FieldValue::Flag(true)))
    }

    /// Non-blank list entries, trimmed.
    #[must_use]
    pub fn list(&self, field: Field) -> Vec<&str> {
        match self.values.get(&field) {
            Some(FieldValue::List(items)) => items
                .iter()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// True when the field holds a non-blank value.
    #[must_use]
    pub fn is_set(&self, field: Field) -> bool {
        self.values.get(&field).is_some_and(|v| !v.is_blank())
    }

    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.values.keys().copied()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
