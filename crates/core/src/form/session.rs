use crate::form::machine::TransitionRejected;
use crate::model::step::{self, StepDefinition};
use crate::model::{AgeBracket, BookingReceipt, CourseOptions, FormData, Step};
use crate::validation::{FieldErrors, ValidationError};

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormState {
    InProgress(Step),
    Submitted(BookingReceipt),
}

/// State of one in-progress booking.
///
/// Owned by exactly one form instance. All changes to step, bracket and
/// values go through [`FormSession::transition`] / [`FormSession::apply`];
/// the submission flag is driven by the submission pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormSession {
    pub(crate) state: FormState,
    pub(crate) bracket: Option<AgeBracket>,
    pub(crate) data: FormData,
    pub(crate) errors: FieldErrors,
    pub(crate) submitting: bool,
    pub(crate) course_options: CourseOptions,
}

impl Default for FormSession {
    fn default() -> Self {
        Self::new()
    }
}

impl FormSession {
    /// Empty session on the age-verification step.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: FormState::InProgress(Step::AgeVerification),
            bracket: None,
            data: FormData::new(),
            errors: FieldErrors::new(),
            submitting: false,
            course_options: CourseOptions::NotLoaded,
        }
    }

    /// Fresh session that keeps the already loaded course list.
    #[must_use]
    pub fn reset(&self) -> Self {
        Self {
            course_options: self.course_options.clone(),
            ..Self::new()
        }
    }

    #[must_use]
    pub fn state(&self) -> &FormState {
        &self.state
    }

    /// Current step, `None` once submitted.
    #[must_use]
    pub fn step(&self) -> Option<Step> {
        match self.state {
            FormState::InProgress(step) => Some(step),
            FormState::Submitted(_) => None,
        }
    }

    #[must_use]
    pub fn bracket(&self) -> Option<AgeBracket> {
        self.bracket
    }

    #[must_use]
    pub fn data(&self) -> &FormData {
        &self.data
    }

    #[must_use]
    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    #[must_use]
    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    #[must_use]
    pub fn is_submitted(&self) -> bool {
        matches!(self.state, FormState::Submitted(_))
    }

    #[must_use]
    pub fn receipt(&self) -> Option<&BookingReceipt> {
        match &self.state {
            FormState::Submitted(receipt) => Some(receipt),
            FormState::InProgress(_) => None,
        }
    }

    #[must_use]
    pub fn course_options(&self) -> &CourseOptions {
        &self.course_options
    }

    /// Course loading is independent of the step machine and may land at any time.
    pub fn set_course_options(&mut self, options: CourseOptions) {
        self.course_options = options;
    }

    /// Definition of the current step on the active path.
    #[must_use]
    pub fn current_definition(&self) -> Option<&'static StepDefinition> {
        self.step().and_then(|step| step::definition(self.bracket, step))
    }

    /// 1-based position of the current step and the length of the active path.
    ///
    /// The total is only final once the age question is answered.
    #[must_use]
    pub fn progress(&self) -> Option<(usize, usize)> {
        let step = self.step()?;
        let path = step::path(self.bracket);
        path.iter()
            .position(|def| def.step == step)
            .map(|index| (index + 1, path.len()))
    }

    /// Marks the session as submitting.
    ///
    /// # Errors
    ///
    /// Returns `SubmissionInFlight` if a submission is already pending,
    /// `AlreadySubmitted` after success, and `NotAtConsent` elsewhere.
    pub fn begin_submission(&mut self) -> Result<(), TransitionRejected> {
        if self.is_submitted() {
            return Err(TransitionRejected::AlreadySubmitted);
        }
        if self.submitting {
            return Err(TransitionRejected::SubmissionInFlight);
        }
        if self.step() != Some(Step::Consent) {
            return Err(TransitionRejected::NotAtConsent);
        }
        self.submitting = true;
        Ok(())
    }

    /// Moves to the terminal state after the API accepted the booking.
    pub fn complete_submission(&mut self, receipt: BookingReceipt) {
        self.submitting = false;
        self.errors.clear();
        self.state = FormState::Submitted(receipt);
    }

    /// Re-opens the session for correction after a failed submission.
    pub fn abort_submission(&mut self) {
        self.submitting = false;
    }

    /// Shows errors next to their fields (used for pre-submit and server-side errors).
    pub fn record_errors(&mut self, errors: impl IntoIterator<Item = ValidationError>) {
        for error in errors {
            self.errors.insert(error);
        }
    }

    #[cfg(test)]
    pub(crate) fn set_bracket_unchecked(&mut self, bracket: Option<AgeBracket>) {
        self.bracket = bracket;
    }

    #[cfg(test)]
    pub(crate) fn set_value_unchecked(
        &mut self,
        field: crate::model::Field,
        value: crate::model::FieldValue,
    ) {
        self.data.insert(field, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BookingId, CourseOption, Field, FieldValue};

    fn receipt() -> BookingReceipt {
        BookingReceipt {
            booking_id: BookingId::new("BK-1"),
            message: "Booked".into(),
            follow_up: Vec::new(),
        }
    }

    #[test]
    fn new_session_starts_on_age_verification() {
        let session = FormSession::new();
        assert_eq!(session.step(), Some(Step::AgeVerification));
        assert_eq!(session.bracket(), None);
        assert!(session.data().is_empty());
        assert!(!session.is_submitting());
        assert_eq!(session.progress(), Some((1, 1)));
    }

    #[test]
    fn begin_submission_only_from_consent() {
        let mut session = FormSession::new();
        assert_eq!(
            session.begin_submission(),
            Err(TransitionRejected::NotAtConsent)
        );

        session.state = FormState::InProgress(Step::Consent);
        session.begin_submission().unwrap();
        assert!(session.is_submitting());
        assert_eq!(
            session.begin_submission(),
            Err(TransitionRejected::SubmissionInFlight)
        );
    }

    #[test]
    fn failed_submission_keeps_data() {
        let mut session = FormSession::new();
        session.state = FormState::InProgress(Step::Consent);
        session.set_value_unchecked(Field::City, FieldValue::text("Pune"));
        session.begin_submission().unwrap();
        session.abort_submission();

        assert!(!session.is_submitting());
        assert_eq!(session.step(), Some(Step::Consent));
        assert_eq!(session.data().text(Field::City), Some("Pune"));
    }

    #[test]
    fn completed_submission_is_terminal() {
        let mut session = FormSession::new();
        session.state = FormState::InProgress(Step::Consent);
        session.begin_submission().unwrap();
        session.complete_submission(receipt());

        assert!(session.is_submitted());
        assert_eq!(session.step(), None);
        assert_eq!(session.receipt().unwrap().booking_id.as_str(), "BK-1");
        assert_eq!(
            session.begin_submission(),
            Err(TransitionRejected::AlreadySubmitted)
        );
    }

    #[test]
    fn reset_keeps_course_list_only() {
        let mut session = FormSession::new();
        session.set_value_unchecked(Field::City, FieldValue::text("Pune"));
        session.set_course_options(CourseOptions::Loaded(vec![CourseOption::new("c1", "Robotics")]));

        let fresh = session.reset();
        assert!(fresh.data().is_empty());
        assert_eq!(fresh.course_options().options().len(), 1);
    }
}
