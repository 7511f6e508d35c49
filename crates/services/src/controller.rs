use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use booking_core::model::{BookingReceipt, CourseOptions, Field, FieldValue, Step};
use booking_core::{
    Answers, Effect, Event, FormSession, PayloadError, SubmissionContext, SubmissionPayload,
    TransitionRejected, Validator,
};

use crate::catalog::CourseCatalog;
use crate::error::SubmissionFailure;
use crate::pipeline::SubmissionPipeline;

pub type SuccessCallback = Arc<dyn Fn(&BookingReceipt) + Send + Sync>;
pub type FailureCallback = Arc<dyn Fn(&SubmissionFailure) + Send + Sync>;

/// What happened to a `submit` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Submitted(BookingReceipt),
    Failed(SubmissionFailure),
    /// Another submission for this session is still pending.
    Ignored,
    /// Not on the consent step, or the form failed local validation.
    ///
    /// Field errors are recorded on the session; the failure callback does
    /// not run because nothing was sent.
    NotReady,
    /// The form went away (unmounted or reset) before the response arrived.
    Discarded,
}

/// Drives one booking form: user events, course loading and submission.
///
/// Cloning yields another handle to the same session.
#[derive(Clone)]
pub struct BookingFormController {
    session: Arc<Mutex<FormSession>>,
    mounted: Arc<AtomicBool>,
    generation: Arc<AtomicU64>,
    validator: Validator,
    pipeline: SubmissionPipeline,
    catalog: Option<Arc<dyn CourseCatalog>>,
    on_success: Option<SuccessCallback>,
    on_failure: Option<FailureCallback>,
}

impl fmt::Debug for BookingFormController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BookingFormController")
            .field("mounted", &self.is_mounted())
            .field("session", &*self.lock())
            .finish_non_exhaustive()
    }
}

impl BookingFormController {
    #[must_use]
    pub fn new(validator: Validator, pipeline: SubmissionPipeline) -> Self {
        Self {
            session: Arc::new(Mutex::new(FormSession::new())),
            mounted: Arc::new(AtomicBool::new(true)),
            generation: Arc::new(AtomicU64::new(0)),
            validator,
            pipeline,
            catalog: None,
            on_success: None,
            on_failure: None,
        }
    }

    #[must_use]
    pub fn with_catalog(mut self, catalog: Arc<dyn CourseCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    #[must_use]
    pub fn on_success(mut self, callback: impl Fn(&BookingReceipt) + Send + Sync + 'static) -> Self {
        self.on_success = Some(Arc::new(callback));
        self
    }

    #[must_use]
    pub fn on_failure(
        mut self,
        callback: impl Fn(&SubmissionFailure) + Send + Sync + 'static,
    ) -> Self {
        self.on_failure = Some(Arc::new(callback));
        self
    }

    fn lock(&self) -> MutexGuard<'_, FormSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    //
    // ─── EVENTS ────────────────────────────────────────────────────────────────
    //

    /// Feed one event to the session.
    ///
    /// # Errors
    ///
    /// Returns `TransitionRejected` when the event is not allowed; invalid
    /// fields are also recorded on the session.
    pub fn dispatch(&self, event: Event) -> Result<Effect, TransitionRejected> {
        self.lock().apply(event, &self.validator)
    }

    /// # Errors
    ///
    /// Returns `TransitionRejected::AgeLocked` off the age-verification step.
    pub fn answer_age(&self, under_16: bool) -> Result<(), TransitionRejected> {
        self.dispatch(Event::AnswerAge(under_16)).map(|_| ())
    }

    /// # Errors
    ///
    /// Returns `TransitionRejected` for inactive fields or mismatched value kinds.
    pub fn set_field(&self, field: Field, value: FieldValue) -> Result<(), TransitionRejected> {
        self.dispatch(Event::SetField(field, value)).map(|_| ())
    }

    /// # Errors
    ///
    /// Returns `TransitionRejected` when the field cannot be cleared now.
    pub fn clear_field(&self, field: Field) -> Result<(), TransitionRejected> {
        self.dispatch(Event::ClearField(field)).map(|_| ())
    }

    /// Validate the current step and advance.
    ///
    /// Returns `Effect::Submit` on the consent step; call [`Self::submit`] then.
    ///
    /// # Errors
    ///
    /// Returns `TransitionRejected::Invalid` without moving when a field fails.
    pub fn next(&self) -> Result<Effect, TransitionRejected> {
        self.dispatch(Event::Next)
    }

    /// # Errors
    ///
    /// Returns `TransitionRejected` while submitting or after submission.
    pub fn prev(&self) -> Result<(), TransitionRejected> {
        self.dispatch(Event::Prev).map(|_| ())
    }

    /// Fill the form from a saved answer set, stopping at the consent step.
    ///
    /// # Errors
    ///
    /// Returns `booking_core::Error` for unknown field names or a step that
    /// fails validation.
    pub fn replay(&self, answers: &Answers) -> Result<Vec<Step>, booking_core::Error> {
        answers.replay(&mut self.lock(), &self.validator)
    }

    #[must_use]
    pub fn snapshot(&self) -> FormSession {
        self.lock().clone()
    }

    /// Start over. A submission still in flight is discarded when it lands.
    pub fn reset(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let mut session = self.lock();
        *session = session.reset();
    }

    /// Marks the form as gone; late responses are dropped.
    pub fn unmount(&self) {
        self.mounted.store(false, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }

    //
    // ─── COURSES ───────────────────────────────────────────────────────────────
    //

    /// Fetch the course list. Any failure leaves manual entry available.
    pub async fn load_courses(&self) -> CourseOptions {
        let Some(catalog) = self.catalog.clone() else {
            let mut session = self.lock();
            session.set_course_options(CourseOptions::Unavailable);
            return CourseOptions::Unavailable;
        };
        self.lock().set_course_options(CourseOptions::Loading);

        let options = match catalog.courses().await {
            Ok(courses) => {
                debug!(count = courses.len(), "loaded course catalog");
                CourseOptions::Loaded(courses)
            }
            Err(e) => {
                warn!(error = %e, "course catalog unavailable, falling back to manual entry");
                CourseOptions::Unavailable
            }
        };

        if self.is_mounted() {
            self.lock().set_course_options(options.clone());
        }
        options
    }

    //
    // ─── SUBMISSION ────────────────────────────────────────────────────────────
    //

    /// Validate the whole form and send it.
    ///
    /// The session lock is released while the request is pending, so other
    /// handles can still read the session.
    pub async fn submit(&self, context: &SubmissionContext) -> SubmitOutcome {
        if !self.is_mounted() {
            return SubmitOutcome::Discarded;
        }
        let generation = self.generation.load(Ordering::SeqCst);

        let payload = {
            let mut session = self.lock();
            if session.is_submitting() {
                debug!("submission already in flight");
                return SubmitOutcome::Ignored;
            }
            if session.step() != Some(Step::Consent) {
                return SubmitOutcome::NotReady;
            }
            match session.apply(Event::Next, &self.validator) {
                Ok(Effect::Submit) => {}
                Ok(Effect::None) => return SubmitOutcome::NotReady,
                Err(TransitionRejected::SubmissionInFlight) => return SubmitOutcome::Ignored,
                Err(_) => return SubmitOutcome::NotReady,
            }

            let payload = match SubmissionPayload::assemble(&session, context, &self.validator) {
                Ok(payload) => payload,
                Err(PayloadError::Invalid(errors)) => {
                    debug!(count = errors.len(), "payload failed validation");
                    session.record_errors(errors);
                    return SubmitOutcome::NotReady;
                }
                Err(_) => return SubmitOutcome::NotReady,
            };
            match session.begin_submission() {
                Ok(()) => payload,
                Err(TransitionRejected::SubmissionInFlight) => return SubmitOutcome::Ignored,
                Err(_) => return SubmitOutcome::NotReady,
            }
        };

        let result = self.pipeline.submit(&payload).await;

        if !self.is_mounted() || self.generation.load(Ordering::SeqCst) != generation {
            info!(submission_id = %payload.submission_id(), "form closed before booking response");
            return SubmitOutcome::Discarded;
        }

        match result {
            Ok(receipt) => {
                self.lock().complete_submission(receipt.clone());
                if let Some(callback) = &self.on_success {
                    callback(&receipt);
                }
                SubmitOutcome::Submitted(receipt)
            }
            Err(failure) => {
                {
                    let mut session = self.lock();
                    session.abort_submission();
                    session.record_errors(failure.validation_errors.iter().cloned());
                }
                if let Some(callback) = &self.on_failure {
                    callback(&failure);
                }
                SubmitOutcome::Failed(failure)
            }
        }
    }
}
