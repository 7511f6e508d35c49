#![forbid(unsafe_code)]

pub mod booking_api;
pub mod catalog;
pub mod config;
pub mod controller;
pub mod error;
pub mod pipeline;
pub mod retry;

pub use booking_core::Clock;

pub use booking_api::{BookingApi, HttpBookingApi};
pub use catalog::{CourseCatalog, HttpCourseCatalog};
pub use config::BookingConfig;
pub use controller::{BookingFormController, SubmitOutcome};
pub use error::{BookingApiError, CatalogError, ConfigError, FailureKind, SubmissionFailure};
pub use pipeline::SubmissionPipeline;
pub use retry::RetryPolicy;
