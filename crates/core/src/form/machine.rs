use thiserror::Error;

use crate::form::session::{FormSession, FormState};
use crate::model::step;
use crate::model::{AgeBracket, Field, FieldKind, FieldValue, Step};
use crate::validation::{FieldErrors, Validator, field_is_active};

//
// ─── EVENTS ────────────────────────────────────────────────────────────────────
//

/// User intent fed to the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Answer (or change the answer to) "is the student under 16?".
    AnswerAge(bool),
    SetField(Field, FieldValue),
    ClearField(Field),
    Next,
    Prev,
}

/// Follow-up work the caller must perform after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    None,
    /// The consent step was completed; run the submission pipeline.
    Submit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub session: FormSession,
    pub effect: Effect,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransitionRejected {
    #[error("current step has {} invalid field(s)", .0.len())]
    Invalid(FieldErrors),

    #[error("the age answer can only be changed on the age-verification step")]
    AgeLocked,

    #[error("field {0} does not belong to the selected age group")]
    InactiveField(Field),

    #[error("field {field} expects a {expected:?} value")]
    WrongValueKind { field: Field, expected: FieldKind },

    #[error("step {0} is not on the active path")]
    OffPath(Step),

    #[error("a submission is already in flight")]
    SubmissionInFlight,

    #[error("the booking has already been submitted")]
    AlreadySubmitted,

    #[error("submission can only start from the consent step")]
    NotAtConsent,
}

//
// ─── TRANSITIONS ───────────────────────────────────────────────────────────────
//

impl FormSession {
    /// Computes the session that results from `event` without touching `self`.
    ///
    /// # Errors
    ///
    /// Returns `TransitionRejected::Invalid` when `Next` is attempted on a step
    /// with failing fields, and the other variants for events that are not
    /// allowed in the current state.
    pub fn transition(
        &self,
        event: Event,
        validator: &Validator,
    ) -> Result<Transition, TransitionRejected> {
        let step = match self.state {
            FormState::Submitted(_) => return Err(TransitionRejected::AlreadySubmitted),
            FormState::InProgress(step) => step,
        };
        if self.submitting {
            return Err(TransitionRejected::SubmissionInFlight);
        }

        let mut next = self.clone();
        let mut effect = Effect::None;

        match event {
            Event::AnswerAge(under_16) => {
                if step != Step::AgeVerification {
                    return Err(TransitionRejected::AgeLocked);
                }
                next.choose_bracket(AgeBracket::from_under_16(under_16));
            }
            Event::SetField(Field::IsStudentUnder16, value) => match value {
                FieldValue::Flag(under_16) => {
                    return self.transition(Event::AnswerAge(under_16), validator);
                }
                _ => {
                    return Err(TransitionRejected::WrongValueKind {
                        field: Field::IsStudentUnder16,
                        expected: FieldKind::Flag,
                    });
                }
            },
            Event::SetField(field, value) => {
                if value.kind() != field.kind() {
                    return Err(TransitionRejected::WrongValueKind {
                        field,
                        expected: field.kind(),
                    });
                }
                if !field_is_active(field, self.bracket) {
                    return Err(TransitionRejected::InactiveField(field));
                }
                next.data.insert(field, value);
                next.errors.remove(field);
            }
            Event::ClearField(Field::IsStudentUnder16) => {
                if step != Step::AgeVerification {
                    return Err(TransitionRejected::AgeLocked);
                }
                next.bracket = None;
            }
            Event::ClearField(field) => {
                next.data.remove(field);
                next.errors.remove(field);
            }
            Event::Next => {
                let def = self
                    .current_definition()
                    .ok_or(TransitionRejected::OffPath(step))?;
                let errors = validator.validate_step(self, def);
                if !errors.is_empty() {
                    return Err(TransitionRejected::Invalid(errors));
                }
                for field in def.fields {
                    next.errors.remove(*field);
                }
                if step == Step::Consent {
                    effect = Effect::Submit;
                } else {
                    let path = step::path(self.bracket);
                    let index = path
                        .iter()
                        .position(|d| d.step == step)
                        .ok_or(TransitionRejected::OffPath(step))?;
                    if let Some(following) = path.get(index + 1) {
                        next.state = FormState::InProgress(following.step);
                    }
                }
            }
            Event::Prev => {
                let path = step::path(self.bracket);
                let index = path
                    .iter()
                    .position(|d| d.step == step)
                    .ok_or(TransitionRejected::OffPath(step))?;
                if let Some(previous) = index.checked_sub(1).and_then(|i| path.get(i)) {
                    next.state = FormState::InProgress(previous.step);
                }
            }
        }

        Ok(Transition {
            session: next,
            effect,
        })
    }

    /// Applies `event` in place.
    ///
    /// A rejected `Next` leaves the step unchanged and records the step's
    /// errors on the session so they can be shown next to their fields.
    ///
    /// # Errors
    ///
    /// Returns the same rejections as [`FormSession::transition`].
    pub fn apply(
        &mut self,
        event: Event,
        validator: &Validator,
    ) -> Result<Effect, TransitionRejected> {
        match self.transition(event, validator) {
            Ok(transition) => {
                *self = transition.session;
                Ok(transition.effect)
            }
            Err(TransitionRejected::Invalid(errors)) => {
                self.record_errors(errors.iter().cloned());
                Err(TransitionRejected::Invalid(errors))
            }
            Err(other) => Err(other),
        }
    }

    fn choose_bracket(&mut self, bracket: AgeBracket) {
        self.bracket = Some(bracket);
        let abandoned: Vec<Field> = self
            .data
            .fields()
            .filter(|field| field.branch() == Some(bracket.other()))
            .collect();
        for field in abandoned {
            self.data.remove(field);
            self.errors.remove(field);
        }
        self.errors.remove(Field::IsStudentUnder16);
    }
}
