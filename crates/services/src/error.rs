//! Shared error types for the services crate.

use thiserror::Error;

use booking_core::ValidationError;

pub const SUBMISSION_FAILED: &str = "SUBMISSION_FAILED";
pub const GENERIC_FAILURE_MESSAGE: &str = "Unable to submit your booking right now. Please try again.";

/// Errors emitted by a single call to the booking API.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BookingApiError {
    #[error("booking request timed out")]
    Timeout,
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("booking request failed with status {status}")]
    Status {
        status: reqwest::StatusCode,
        code: Option<String>,
        message: Option<String>,
        validation_errors: Vec<ValidationError>,
    },
    #[error("booking was rejected: {message}")]
    Rejected {
        code: Option<String>,
        message: String,
        validation_errors: Vec<ValidationError>,
    },
    #[error("booking response could not be read: {0}")]
    Malformed(String),
}

impl BookingApiError {
    /// Server-provided message, when there is one worth showing.
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            BookingApiError::Status { message, .. } => message.as_deref(),
            BookingApiError::Rejected { message, .. } => Some(message),
            _ => None,
        }
    }

    #[must_use]
    pub fn server_code(&self) -> Option<&str> {
        match self {
            BookingApiError::Status { code, .. } | BookingApiError::Rejected { code, .. } => {
                code.as_deref()
            }
            _ => None,
        }
    }

    #[must_use]
    pub fn validation_errors(&self) -> &[ValidationError] {
        match self {
            BookingApiError::Status {
                validation_errors, ..
            }
            | BookingApiError::Rejected {
                validation_errors, ..
            } => validation_errors,
            _ => &[],
        }
    }
}

/// Errors emitted by `CourseCatalog` implementations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("course request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted while loading `BookingConfig`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("BOOKING_API_BASE_URL is not set")]
    MissingBaseUrl,
    #[error("invalid booking API base URL {url:?}: {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error(transparent)]
    Client(#[from] reqwest::Error),
}

/// How a submission ended when it did not produce a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum FailureKind {
    /// The server refused the booking (4xx or `success: false`).
    Rejected,
    /// Every attempt hit a transient failure.
    Exhausted,
    /// The server answered with something we could not read.
    Unexpected,
}

/// Structured failure handed to the failure callback.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct SubmissionFailure {
    pub kind: FailureKind,
    pub code: String,
    pub message: String,
    /// Last low-level error, for logs.
    pub detail: Option<String>,
    pub attempts: u32,
    pub validation_errors: Vec<ValidationError>,
}

impl SubmissionFailure {
    #[must_use]
    pub fn exhausted(attempts: u32, last: &BookingApiError) -> Self {
        Self {
            kind: FailureKind::Exhausted,
            code: SUBMISSION_FAILED.to_string(),
            message: GENERIC_FAILURE_MESSAGE.to_string(),
            detail: Some(last.to_string()),
            attempts,
            validation_errors: Vec::new(),
        }
    }

    /// Maps a non-retryable API error, keeping the server's words when present.
    #[must_use]
    pub fn from_api(attempts: u32, error: BookingApiError) -> Self {
        let kind = match error {
            BookingApiError::Malformed(_) => FailureKind::Unexpected,
            _ => FailureKind::Rejected,
        };
        let message = match kind {
            FailureKind::Unexpected => GENERIC_FAILURE_MESSAGE.to_string(),
            _ => error
                .server_message()
                .unwrap_or(GENERIC_FAILURE_MESSAGE)
                .to_string(),
        };
        Self {
            kind,
            code: error.server_code().unwrap_or(SUBMISSION_FAILED).to_string(),
            message,
            detail: Some(error.to_string()),
            attempts,
            validation_errors: error.validation_errors().to_vec(),
        }
    }
}
