#![forbid(unsafe_code)]

pub mod error;
pub mod form;
pub mod model;
pub mod payload;
pub mod time;
pub mod validation;

pub use error::Error;
pub use form::{Answers, Effect, Event, FormSession, FormState, Transition, TransitionRejected};
pub use payload::{DeviceInfo, PayloadError, SubmissionContext, SubmissionPayload, UtmParams};
pub use time::Clock;
pub use validation::{ErrorCode, FieldErrors, ValidationError, Validator};
