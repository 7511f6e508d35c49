use thiserror::Error;

use crate::form::TransitionRejected;
use crate::model::UnknownFieldError;
use crate::payload::PayloadError;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Transition(#[from] TransitionRejected),
    #[error(transparent)]
    Payload(#[from] PayloadError),
    #[error(transparent)]
    UnknownField(#[from] UnknownFieldError),
}
