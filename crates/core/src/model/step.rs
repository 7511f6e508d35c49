use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::field::Field;

//
// ─── AGE BRACKET ───────────────────────────────────────────────────────────────
//

/// Branch selector answered on the first step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgeBracket {
    Under16,
    SixteenPlus,
}

impl AgeBracket {
    #[must_use]
    pub fn from_under_16(under_16: bool) -> Self {
        if under_16 {
            Self::Under16
        } else {
            Self::SixteenPlus
        }
    }

    #[must_use]
    pub fn is_under_16(self) -> bool {
        matches!(self, Self::Under16)
    }

    #[must_use]
    pub fn other(self) -> Self {
        match self {
            Self::Under16 => Self::SixteenPlus,
            Self::SixteenPlus => Self::Under16,
        }
    }
}

//
// ─── STEPS ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Step {
    AgeVerification,
    ParentDetails,
    StudentDetails,
    DemoDetails,
    Consent,
}

impl Step {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Step::AgeVerification => "age-verification",
            Step::ParentDetails => "parent-details",
            Step::StudentDetails => "student-details",
            Step::DemoDetails => "demo-details",
            Step::Consent => "consent",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static description of one step on a branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepDefinition {
    pub step: Step,
    /// Every field collected on this step, in display order.
    pub fields: &'static [Field],
    /// Subset of `fields` that must hold a value.
    pub required: &'static [Field],
}

impl StepDefinition {
    #[must_use]
    pub fn is_required(&self, field: Field) -> bool {
        self.required.contains(&field)
    }
}

const AGE_VERIFICATION: StepDefinition = StepDefinition {
    step: Step::AgeVerification,
    fields: &[Field::IsStudentUnder16],
    required: &[Field::IsStudentUnder16],
};

const PARENT_DETAILS: StepDefinition = StepDefinition {
    step: Step::ParentDetails,
    fields: &[
        Field::ParentName,
        Field::ParentEmail,
        Field::ParentCountryCode,
        Field::ParentPhone,
        Field::ParentRelationship,
        Field::City,
        Field::Country,
    ],
    required: &[
        Field::ParentName,
        Field::ParentEmail,
        Field::ParentPhone,
        Field::City,
    ],
};

const STUDENT_DETAILS_UNDER_16: StepDefinition = StepDefinition {
    step: Step::StudentDetails,
    fields: &[
        Field::StudentName,
        Field::StudentGrade,
        Field::SchoolName,
        Field::PreferredCourses,
    ],
    required: &[
        Field::StudentName,
        Field::StudentGrade,
        Field::PreferredCourses,
    ],
};

const STUDENT_DETAILS_SIXTEEN_PLUS: StepDefinition = StepDefinition {
    step: Step::StudentDetails,
    fields: &[
        Field::StudentName,
        Field::StudentEmail,
        Field::StudentCountryCode,
        Field::StudentPhone,
        Field::City,
        Field::Country,
        Field::CurrentlyStudying,
        Field::CurrentlyWorking,
        Field::InstitutionName,
        Field::PreferredCourses,
    ],
    required: &[
        Field::StudentName,
        Field::StudentEmail,
        Field::StudentPhone,
        Field::City,
        Field::PreferredCourses,
    ],
};

const DEMO_DETAILS: StepDefinition = StepDefinition {
    step: Step::DemoDetails,
    fields: &[
        Field::PreferredDate,
        Field::PreferredTimeSlot,
        Field::Timezone,
        Field::SessionDuration,
        Field::PreviousDemoAttended,
    ],
    required: &[],
};

const CONSENT_UNDER_16: StepDefinition = StepDefinition {
    step: Step::Consent,
    fields: &[
        Field::TermsAndPrivacy,
        Field::ParentConsent,
        Field::MarketingConsent,
        Field::MarketingEmail,
        Field::MarketingSms,
        Field::MarketingWhatsapp,
    ],
    required: &[Field::TermsAndPrivacy, Field::ParentConsent],
};

const CONSENT_SIXTEEN_PLUS: StepDefinition = StepDefinition {
    step: Step::Consent,
    fields: &[
        Field::TermsAndPrivacy,
        Field::MarketingConsent,
        Field::MarketingEmail,
        Field::MarketingSms,
        Field::MarketingWhatsapp,
    ],
    required: &[Field::TermsAndPrivacy],
};

const UNANSWERED_PATH: &[StepDefinition] = &[AGE_VERIFICATION];

const UNDER_16_PATH: &[StepDefinition] = &[
    AGE_VERIFICATION,
    PARENT_DETAILS,
    STUDENT_DETAILS_UNDER_16,
    DEMO_DETAILS,
    CONSENT_UNDER_16,
];

const SIXTEEN_PLUS_PATH: &[StepDefinition] = &[
    AGE_VERIFICATION,
    STUDENT_DETAILS_SIXTEEN_PLUS,
    DEMO_DETAILS,
    CONSENT_SIXTEEN_PLUS,
];

/// Ordered steps for a bracket; only the first step exists until it is answered.
#[must_use]
pub fn path(bracket: Option<AgeBracket>) -> &'static [StepDefinition] {
    match bracket {
        None => UNANSWERED_PATH,
        Some(AgeBracket::Under16) => UNDER_16_PATH,
        Some(AgeBracket::SixteenPlus) => SIXTEEN_PLUS_PATH,
    }
}

/// Definition of `step` on the active path, if the step is on it.
#[must_use]
pub fn definition(bracket: Option<AgeBracket>, step: Step) -> Option<&'static StepDefinition> {
    path(bracket).iter().find(|def| def.step == step)
}
