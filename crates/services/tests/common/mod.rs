#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::time::Instant;

use booking_core::model::{BookingId, BookingReceipt, CourseOption, Field, FieldValue};
use booking_core::time::fixed_clock;
use booking_core::{SubmissionPayload, Validator};
use services::error::CatalogError;
use services::{
    BookingApi, BookingApiError, BookingFormController, CourseCatalog, RetryPolicy,
    SubmissionPipeline,
};

/// Canned reply for one call to [`ScriptedApi`].
pub enum Reply {
    Accept(&'static str),
    Status(u16),
    Hang,
}

/// Fake `BookingApi` that answers from a script and records call times.
#[derive(Clone, Default)]
pub struct ScriptedApi {
    script: Arc<Mutex<VecDeque<Reply>>>,
    calls: Arc<Mutex<Vec<Instant>>>,
    payloads: Arc<Mutex<Vec<SubmissionPayload>>>,
    gate: Option<Arc<Notify>>,
}

impl ScriptedApi {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
        Self {
            script: Arc::new(Mutex::new(replies.into_iter().collect())),
            ..Self::default()
        }
    }

    /// Every call waits for `gate` before answering.
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_payload(&self) -> Option<SubmissionPayload> {
        self.payloads.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl BookingApi for ScriptedApi {
    async fn submit(&self, payload: &SubmissionPayload) -> Result<BookingReceipt, BookingApiError> {
        self.calls.lock().unwrap().push(Instant::now());
        self.payloads.lock().unwrap().push(payload.clone());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let reply = self.script.lock().unwrap().pop_front().unwrap_or(Reply::Status(500));
        match reply {
            Reply::Accept(id) => Ok(BookingReceipt {
                booking_id: BookingId::new(id),
                message: "Demo booked".into(),
                follow_up: Vec::new(),
            }),
            Reply::Status(code) => Err(BookingApiError::Status {
                status: reqwest::StatusCode::from_u16(code).unwrap(),
                code: None,
                message: Some(format!("status {code}")),
                validation_errors: Vec::new(),
            }),
            Reply::Hang => std::future::pending().await,
        }
    }
}

pub struct FixedCatalog(pub Vec<CourseOption>);

#[async_trait]
impl CourseCatalog for FixedCatalog {
    async fn courses(&self) -> Result<Vec<CourseOption>, CatalogError> {
        Ok(self.0.clone())
    }
}

pub struct BrokenCatalog;

#[async_trait]
impl CourseCatalog for BrokenCatalog {
    async fn courses(&self) -> Result<Vec<CourseOption>, CatalogError> {
        Err(CatalogError::HttpStatus(reqwest::StatusCode::SERVICE_UNAVAILABLE))
    }
}

pub fn policy() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_secs(1)).with_attempt_timeout(Duration::from_secs(30))
}

pub fn controller(api: &ScriptedApi) -> BookingFormController {
    let pipeline = SubmissionPipeline::new(Arc::new(api.clone()), policy());
    BookingFormController::new(Validator::new(fixed_clock()), pipeline)
}

/// Walks `controller` to the consent step as Jane Doe, 16 or older.
pub fn fill_jane(controller: &BookingFormController) {
    controller.answer_age(false).unwrap();
    controller.next().unwrap();
    for (field, value) in [
        (Field::StudentName, FieldValue::text("Jane Doe")),
        (Field::StudentEmail, FieldValue::text("jane@x.com")),
        (Field::StudentPhone, FieldValue::text("9876543210")),
        (Field::City, FieldValue::text("Pune")),
        (Field::PreferredCourses, FieldValue::list(["AI & Data Science"])),
    ] {
        controller.set_field(field, value).unwrap();
    }
    controller.next().unwrap();
    controller.next().unwrap();
    controller
        .set_field(Field::TermsAndPrivacy, FieldValue::Flag(true))
        .unwrap();
}
