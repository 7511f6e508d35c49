mod course;
mod demo;
mod field;
mod ids;
mod receipt;
pub mod step;

pub use course::{CourseOption, CourseOptions};
pub use demo::{SessionDuration, TimeSlot, UnknownOptionError};
pub use field::{Field, FieldKind, FieldValue, FormData, UnknownFieldError};
pub use ids::{BookingId, ParseIdError, SubmissionId};
pub use receipt::BookingReceipt;
pub use step::{AgeBracket, Step, StepDefinition};
