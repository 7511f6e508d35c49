use std::sync::Arc;

use tracing::{error, info, warn};

use booking_core::SubmissionPayload;
use booking_core::model::BookingReceipt;

use crate::booking_api::BookingApi;
use crate::error::{BookingApiError, SubmissionFailure};
use crate::retry::RetryPolicy;

/// Sends an assembled payload under a retry policy and classifies the outcome.
#[derive(Clone)]
pub struct SubmissionPipeline {
    api: Arc<dyn BookingApi>,
    policy: RetryPolicy,
}

impl SubmissionPipeline {
    #[must_use]
    pub fn new(api: Arc<dyn BookingApi>, policy: RetryPolicy) -> Self {
        Self { api, policy }
    }

    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Submit `payload`, retrying transient failures.
    ///
    /// # Errors
    ///
    /// Returns a `SubmissionFailure` with the server's message for rejections,
    /// or the generic `SUBMISSION_FAILED` failure once retries run out.
    pub async fn submit(
        &self,
        payload: &SubmissionPayload,
    ) -> Result<BookingReceipt, SubmissionFailure> {
        let submission_id = payload.submission_id();
        info!(%submission_id, under_16 = payload.is_student_under_16(), "submitting booking");

        let result = self.policy.run(|_| self.api.submit(payload)).await;

        match result {
            Ok((receipt, attempts)) => {
                info!(%submission_id, booking_id = %receipt.booking_id, attempts, "booking accepted");
                Ok(receipt)
            }
            Err(exhausted) if exhausted.retryable => {
                error!(
                    %submission_id,
                    attempts = exhausted.attempts,
                    error = %exhausted.last_error,
                    "booking failed after retries"
                );
                Err(SubmissionFailure::exhausted(
                    exhausted.attempts,
                    &exhausted.last_error,
                ))
            }
            Err(exhausted) => {
                match &exhausted.last_error {
                    BookingApiError::Malformed(detail) => {
                        error!(%submission_id, %detail, "unreadable booking response");
                    }
                    other => warn!(%submission_id, error = %other, "booking rejected"),
                }
                Err(SubmissionFailure::from_api(
                    exhausted.attempts,
                    exhausted.last_error,
                ))
            }
        }
    }
}
