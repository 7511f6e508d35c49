//! Projection of a finished session into the booking API's request body.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::form::FormSession;
use crate::model::{AgeBracket, Field, SessionDuration, SubmissionId, TimeSlot};
use crate::validation::phone::{DEFAULT_COUNTRY_CODE, normalize_number};
use crate::validation::rules::split_name;
use crate::validation::{ValidationError, Validator};

pub const FORM_TYPE: &str = "demo_booking";
pub const DEFAULT_COUNTRY: &str = "India";
pub const DEFAULT_TIMEZONE: &str = "Asia/Kolkata";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PayloadError {
    #[error("the age question has not been answered")]
    AgeNotAnswered,
    #[error("{} field(s) failed validation", .0.len())]
    Invalid(Vec<ValidationError>),
}

//
// ─── CONTEXT ───────────────────────────────────────────────────────────────────
//

/// Browser/device details attached for analytics only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screen_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screen_height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// Campaign attribution captured from the landing page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtmParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utm_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utm_medium: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utm_campaign: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utm_term: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utm_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
}

impl UtmParams {
    /// Reads `utm_*` query parameters; unknown parameters are ignored.
    #[must_use]
    pub fn from_landing_url(url: &Url) -> Self {
        let mut params = Self::default();
        for (key, value) in url.query_pairs() {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            let slot = match &*key {
                "utm_source" => &mut params.utm_source,
                "utm_medium" => &mut params.utm_medium,
                "utm_campaign" => &mut params.utm_campaign,
                "utm_term" => &mut params.utm_term,
                "utm_content" => &mut params.utm_content,
                _ => continue,
            };
            *slot = Some(value.to_string());
        }
        params
    }

    /// Parses `landing` and extracts its UTM parameters.
    ///
    /// # Errors
    ///
    /// Returns `url::ParseError` if `landing` is not an absolute URL.
    pub fn parse(landing: &str) -> Result<Self, url::ParseError> {
        Url::parse(landing).map(|url| Self::from_landing_url(&url))
    }

    #[must_use]
    pub fn with_referrer(mut self, referrer: impl Into<String>) -> Self {
        self.referrer = Some(referrer.into());
        self
    }
}

/// Submit-time inputs that do not live in the form itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionContext {
    pub captcha_token: Option<String>,
    pub device_info: Option<DeviceInfo>,
    pub utm: UtmParams,
    pub form_version: String,
}

impl Default for SubmissionContext {
    fn default() -> Self {
        Self {
            captcha_token: None,
            device_info: None,
            utm: UtmParams::default(),
            form_version: "1.0".to_string(),
        }
    }
}

//
// ─── PAYLOAD ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mobile {
    pub country_code: String,
    pub number: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactInfo {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub mobile: Mobile,
    pub city: String,
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParentDetails {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub mobile: Mobile,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationship: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudentDetails {
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub school_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile: Option<Mobile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currently_studying: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currently_working: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub institution_name: Option<String>,
    pub preferred_course: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DemoSessionDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_date: Option<NaiveDate>,
    pub preferred_time_slot: Option<TimeSlot>,
    pub timezone: String,
    pub session_duration_preference: Option<SessionDuration>,
    pub previous_demo_attended: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConsentFlags {
    pub terms_and_privacy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_consent: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MarketingPreferences {
    pub opt_in: bool,
    pub email: bool,
    pub sms: bool,
    pub whatsapp: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormConfig {
    pub form_type: &'static str,
    pub form_version: String,
    pub submission_id: SubmissionId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionMetadata {
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_info: Option<DeviceInfo>,
    pub validation_passed: bool,
    #[serde(flatten)]
    pub utm: UtmParams,
}

/// Immutable request body for `POST /forms/submit`.
///
/// Built once by [`SubmissionPayload::assemble`]; only read access is exposed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionPayload {
    form_type: &'static str,
    captcha_token: Option<String>,
    is_student_under_16: bool,
    contact_info: ContactInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent_details: Option<ParentDetails>,
    student_details: StudentDetails,
    demo_session_details: DemoSessionDetails,
    consent: ConsentFlags,
    marketing_preferences: MarketingPreferences,
    form_config: FormConfig,
    submission_metadata: SubmissionMetadata,
}

impl SubmissionPayload {
    /// Re-validates the whole session and projects it into the request body.
    ///
    /// # Errors
    ///
    /// Returns `PayloadError::AgeNotAnswered` before the first step is done and
    /// `PayloadError::Invalid` with every failing field otherwise.
    pub fn assemble(
        session: &FormSession,
        context: &SubmissionContext,
        validator: &Validator,
    ) -> Result<Self, PayloadError> {
        let bracket = session.bracket().ok_or(PayloadError::AgeNotAnswered)?;
        let errors = validator.validate_all(session);
        if !errors.is_empty() {
            return Err(PayloadError::Invalid(errors));
        }

        let data = session.data();
        let text = |field: Field| data.text(field).unwrap_or_default().to_string();
        let optional = |field: Field| data.text(field).map(str::to_string);
        let mobile = |code: Field, number: Field| Mobile {
            country_code: data
                .text(code)
                .unwrap_or(DEFAULT_COUNTRY_CODE)
                .to_string(),
            number: data
                .text(number)
                .and_then(normalize_number)
                .unwrap_or_default(),
        };
        let city = text(Field::City);
        let country = data.text(Field::Country).unwrap_or(DEFAULT_COUNTRY).to_string();
        let (student_first, student_last) = split_name(&text(Field::StudentName));
        let preferred_course = data
            .list(Field::PreferredCourses)
            .into_iter()
            .map(str::to_string)
            .collect();

        let (contact_info, parent_details, student_details) = match bracket {
            AgeBracket::Under16 => {
                let (first_name, last_name) = split_name(&text(Field::ParentName));
                let parent_mobile = mobile(Field::ParentCountryCode, Field::ParentPhone);
                let contact = ContactInfo {
                    first_name: first_name.clone(),
                    last_name: last_name.clone(),
                    email: text(Field::ParentEmail),
                    mobile: parent_mobile.clone(),
                    city,
                    country,
                };
                let parent = ParentDetails {
                    first_name,
                    last_name,
                    email: text(Field::ParentEmail),
                    mobile: parent_mobile,
                    relationship: optional(Field::ParentRelationship),
                };
                let student = StudentDetails {
                    first_name: student_first,
                    last_name: student_last,
                    grade: optional(Field::StudentGrade),
                    school_name: optional(Field::SchoolName),
                    email: None,
                    mobile: None,
                    currently_studying: None,
                    currently_working: None,
                    institution_name: None,
                    preferred_course,
                };
                (contact, Some(parent), student)
            }
            AgeBracket::SixteenPlus => {
                let student_mobile = mobile(Field::StudentCountryCode, Field::StudentPhone);
                let contact = ContactInfo {
                    first_name: student_first.clone(),
                    last_name: student_last.clone(),
                    email: text(Field::StudentEmail),
                    mobile: student_mobile.clone(),
                    city,
                    country,
                };
                let student = StudentDetails {
                    first_name: student_first,
                    last_name: student_last,
                    grade: None,
                    school_name: None,
                    email: Some(text(Field::StudentEmail)),
                    mobile: Some(student_mobile),
                    currently_studying: Some(data.flag(Field::CurrentlyStudying)),
                    currently_working: Some(data.flag(Field::CurrentlyWorking)),
                    institution_name: optional(Field::InstitutionName),
                    preferred_course,
                };
                (contact, None, student)
            }
        };

        // Values were validated above, so failed parses only mean "absent".
        let demo_session_details = DemoSessionDetails {
            preferred_date: data
                .text(Field::PreferredDate)
                .and_then(|raw| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()),
            preferred_time_slot: data
                .text(Field::PreferredTimeSlot)
                .and_then(|raw| raw.parse().ok()),
            timezone: data
                .text(Field::Timezone)
                .unwrap_or(DEFAULT_TIMEZONE)
                .to_string(),
            session_duration_preference: data
                .text(Field::SessionDuration)
                .and_then(|raw| raw.parse().ok()),
            previous_demo_attended: data.flag(Field::PreviousDemoAttended),
        };

        let opt_in = data.flag(Field::MarketingConsent);
        let marketing_preferences = MarketingPreferences {
            opt_in,
            email: opt_in && data.flag(Field::MarketingEmail),
            sms: opt_in && data.flag(Field::MarketingSms),
            whatsapp: opt_in && data.flag(Field::MarketingWhatsapp),
        };

        Ok(Self {
            form_type: FORM_TYPE,
            captcha_token: context.captcha_token.clone(),
            is_student_under_16: bracket.is_under_16(),
            contact_info,
            parent_details,
            student_details,
            demo_session_details,
            consent: ConsentFlags {
                terms_and_privacy: data.flag(Field::TermsAndPrivacy),
                parent_consent: bracket
                    .is_under_16()
                    .then(|| data.flag(Field::ParentConsent)),
            },
            marketing_preferences,
            form_config: FormConfig {
                form_type: FORM_TYPE,
                form_version: context.form_version.clone(),
                submission_id: SubmissionId::generate(),
            },
            submission_metadata: SubmissionMetadata {
                timestamp: validator.clock().now(),
                device_info: context.device_info.clone(),
                validation_passed: true,
                utm: context.utm.clone(),
            },
        })
    }

    #[must_use]
    pub fn is_student_under_16(&self) -> bool {
        self.is_student_under_16
    }

    #[must_use]
    pub fn contact_info(&self) -> &ContactInfo {
        &self.contact_info
    }

    #[must_use]
    pub fn parent_details(&self) -> Option<&ParentDetails> {
        self.parent_details.as_ref()
    }

    #[must_use]
    pub fn student_details(&self) -> &StudentDetails {
        &self.student_details
    }

    #[must_use]
    pub fn demo_session_details(&self) -> &DemoSessionDetails {
        &self.demo_session_details
    }

    #[must_use]
    pub fn marketing_preferences(&self) -> MarketingPreferences {
        self.marketing_preferences
    }

    #[must_use]
    pub fn submission_id(&self) -> SubmissionId {
        self.form_config.submission_id
    }

    #[must_use]
    pub fn metadata(&self) -> &SubmissionMetadata {
        &self.submission_metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::Answers;
    use crate::time::fixed_clock;

    fn session_from(json: &str) -> FormSession {
        let answers: Answers = serde_json::from_str(json).unwrap();
        let mut session = FormSession::new();
        answers
            .replay(&mut session, &Validator::new(fixed_clock()))
            .unwrap();
        session
    }

    fn jane() -> FormSession {
        session_from(
            r#"{
                "is_student_under_16": false,
                "fields": {
                    "studentName": "Jane Doe",
                    "studentEmail": "jane@x.com",
                    "studentPhone": "9876543210",
                    "city": "Pune",
                    "preferredCourses": ["AI & Data Science"],
                    "termsAndPrivacy": true
                }
            }"#,
        )
    }

    #[test]
    fn sixteen_plus_payload_shape() {
        let payload = SubmissionPayload::assemble(
            &jane(),
            &SubmissionContext::default(),
            &Validator::new(fixed_clock()),
        )
        .unwrap();
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["form_type"], "demo_booking");
        assert_eq!(json["is_student_under_16"], false);
        assert_eq!(
            json["student_details"]["preferred_course"],
            serde_json::json!(["AI & Data Science"])
        );
        assert_eq!(json["contact_info"]["first_name"], "Jane");
        assert_eq!(json["contact_info"]["last_name"], "Doe");
        assert_eq!(json["contact_info"]["mobile"]["country_code"], "+91");
        assert_eq!(json["contact_info"]["mobile"]["number"], "9876543210");
        assert_eq!(json["contact_info"]["country"], "India");
        assert!(json.get("parent_details").is_none());
        assert!(json["demo_session_details"].get("preferred_date").is_none());
        assert_eq!(json["demo_session_details"]["timezone"], "Asia/Kolkata");
        assert_eq!(json["submission_metadata"]["validation_passed"], true);
        assert_eq!(
            json["submission_metadata"]["timestamp"],
            "2023-11-14T22:13:20Z"
        );
    }

    #[test]
    fn under_16_payload_uses_parent_as_contact() {
        let session = session_from(
            r#"{
                "is_student_under_16": true,
                "fields": {
                    "parentName": "Asha Rao",
                    "parentEmail": "asha@example.com",
                    "parentPhone": "98765-43210",
                    "parentRelationship": "Mother",
                    "city": "Bengaluru",
                    "studentName": "Kiran Rao",
                    "studentGrade": "8",
                    "preferredCourses": ["Robotics"],
                    "preferredDate": "2023-11-20",
                    "preferredTimeSlot": "evening",
                    "sessionDurationPreference": "45",
                    "termsAndPrivacy": true,
                    "parentConsent": true,
                    "marketingConsent": true,
                    "marketingWhatsapp": true
                }
            }"#,
        );
        let payload = SubmissionPayload::assemble(
            &session,
            &SubmissionContext::default(),
            &Validator::new(fixed_clock()),
        )
        .unwrap();

        assert!(payload.is_student_under_16());
        assert_eq!(payload.contact_info().email, "asha@example.com");
        assert_eq!(payload.contact_info().mobile.number, "9876543210");
        let parent = payload.parent_details().unwrap();
        assert_eq!(parent.relationship.as_deref(), Some("Mother"));
        assert_eq!(payload.student_details().grade.as_deref(), Some("8"));

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["demo_session_details"]["preferred_date"], "2023-11-20");
        assert_eq!(json["demo_session_details"]["preferred_time_slot"], "evening");
        assert_eq!(json["demo_session_details"]["session_duration_preference"], 45);
        assert_eq!(json["consent"]["parent_consent"], true);
        assert_eq!(json["marketing_preferences"]["whatsapp"], true);
        assert_eq!(json["marketing_preferences"]["sms"], false);
    }

    #[test]
    fn marketing_channels_require_opt_in() {
        let mut session = jane();
        session.set_value_unchecked(Field::MarketingEmail, crate::model::FieldValue::Flag(true));
        let payload = SubmissionPayload::assemble(
            &session,
            &SubmissionContext::default(),
            &Validator::new(fixed_clock()),
        )
        .unwrap();
        assert!(!payload.marketing_preferences().email);
    }

    #[test]
    fn invalid_session_is_not_assembled() {
        let mut session = jane();
        session.set_value_unchecked(
            Field::StudentEmail,
            crate::model::FieldValue::text("not-an-email"),
        );
        let err = SubmissionPayload::assemble(
            &session,
            &SubmissionContext::default(),
            &Validator::new(fixed_clock()),
        )
        .unwrap_err();
        let PayloadError::Invalid(errors) = err else {
            panic!("expected validation errors");
        };
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, Field::StudentEmail);
    }

    #[test]
    fn unanswered_age_is_rejected() {
        let err = SubmissionPayload::assemble(
            &FormSession::new(),
            &SubmissionContext::default(),
            &Validator::new(fixed_clock()),
        )
        .unwrap_err();
        assert_eq!(err, PayloadError::AgeNotAnswered);
    }

    #[test]
    fn utm_params_from_landing_url() {
        let utm = UtmParams::parse(
            "https://academy.example/demo?utm_source=google&utm_medium=cpc&utm_term=&gclid=abc",
        )
        .unwrap()
        .with_referrer("https://google.com");
        assert_eq!(utm.utm_source.as_deref(), Some("google"));
        assert_eq!(utm.utm_medium.as_deref(), Some("cpc"));
        assert_eq!(utm.utm_term, None);
        assert_eq!(utm.utm_campaign, None);

        let context = SubmissionContext {
            utm,
            captcha_token: Some("tok".into()),
            ..SubmissionContext::default()
        };
        let payload =
            SubmissionPayload::assemble(&jane(), &context, &Validator::new(fixed_clock()))
                .unwrap();
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["submission_metadata"]["utm_source"], "google");
        assert_eq!(json["submission_metadata"]["referrer"], "https://google.com");
        assert_eq!(json["captcha_token"], "tok");
        assert!(json["submission_metadata"].get("utm_campaign").is_none());
    }
}
