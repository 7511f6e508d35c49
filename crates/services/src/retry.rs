use std::future::Future;
use std::time::Duration;

use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::error::BookingApiError;

/// Statuses that are never worth repeating.
pub const NON_RETRYABLE_STATUSES: [StatusCode; 5] = [
    StatusCode::BAD_REQUEST,
    StatusCode::UNAUTHORIZED,
    StatusCode::FORBIDDEN,
    StatusCode::NOT_FOUND,
    StatusCode::UNPROCESSABLE_ENTITY,
];

#[must_use]
pub fn default_retryable_status(status: StatusCode) -> bool {
    !status.is_success() && !NON_RETRYABLE_STATUSES.contains(&status)
}

/// Exponential backoff without jitter: `base_delay * 2^(attempt-1)`.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub attempt_timeout: Duration,
    pub retryable_status: fn(StatusCode) -> bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

/// Result of [`RetryPolicy::run`] when no attempt succeeded.
#[derive(Debug)]
pub struct RetryExhausted {
    pub attempts: u32,
    pub last_error: BookingApiError,
    /// `false` when the loop stopped on a non-retryable error.
    pub retryable: bool,
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            attempt_timeout: Duration::from_secs(30),
            retryable_status: default_retryable_status,
        }
    }

    #[must_use]
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_retryable_status(mut self, predicate: fn(StatusCode) -> bool) -> Self {
        self.retryable_status = predicate;
        self
    }

    /// Pause before attempt `attempt + 1`, after attempt `attempt` failed.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1 << exponent)
    }

    #[must_use]
    pub fn is_retryable(&self, error: &BookingApiError) -> bool {
        match error {
            BookingApiError::Timeout | BookingApiError::Http(_) => true,
            BookingApiError::Status { status, .. } => (self.retryable_status)(*status),
            BookingApiError::Rejected { .. } | BookingApiError::Malformed(_) => false,
        }
    }

    /// Runs `attempt` until it succeeds, fails permanently, or attempts run out.
    ///
    /// Each attempt is bounded by `attempt_timeout`.
    ///
    /// # Errors
    ///
    /// Returns `RetryExhausted` carrying the last error.
    pub async fn run<T, F, Fut>(&self, mut attempt: F) -> Result<(T, u32), RetryExhausted>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, BookingApiError>>,
    {
        let mut number = 1;
        loop {
            let timed = tokio::time::timeout(self.attempt_timeout, attempt(number)).await;
            let outcome = match timed {
                Ok(result) => result,
                Err(_) => Err(BookingApiError::Timeout),
            };
            let error = match outcome {
                Ok(value) => return Ok((value, number)),
                Err(error) => error,
            };

            let retryable = self.is_retryable(&error);
            if !retryable || number >= self.max_attempts {
                return Err(RetryExhausted {
                    attempts: number,
                    last_error: error,
                    retryable,
                });
            }

            let delay = self.delay_for(number);
            warn!(attempt = number, ?delay, error = %error, "booking attempt failed, retrying");
            tokio::time::sleep(delay).await;
            number += 1;
            debug!(attempt = number, "retrying booking request");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn status(code: u16) -> BookingApiError {
        BookingApiError::Status {
            status: StatusCode::from_u16(code).unwrap(),
            code: None,
            message: None,
            validation_errors: Vec::new(),
        }
    }

    #[test]
    fn delays_double() {
        let policy = RetryPolicy::new(5, Duration::from_millis(100));
        let delays: Vec<_> = (1..=4).map(|n| policy.delay_for(n)).collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(400),
                Duration::from_millis(800),
            ]
        );
    }

    #[test]
    fn client_errors_are_final() {
        let policy = RetryPolicy::default();
        for code in [400, 401, 403, 404, 422] {
            assert!(!policy.is_retryable(&status(code)), "{code}");
        }
        for code in [408, 429, 500, 502, 503] {
            assert!(policy.is_retryable(&status(code)), "{code}");
        }
        assert!(policy.is_retryable(&BookingApiError::Timeout));
        assert!(!policy.is_retryable(&BookingApiError::Malformed("x".into())));
    }

    #[test]
    fn custom_predicate_is_used() {
        let policy = RetryPolicy::default().with_retryable_status(|_| false);
        assert!(!policy.is_retryable(&status(503)));
    }

    #[tokio::test(start_paused = true)]
    async fn stops_after_max_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::new(3, Duration::from_millis(10));
        let counter = Arc::clone(&calls);
        let result: Result<((), u32), _> = policy
            .run(|_| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(status(503))
                }
            })
            .await;
        let exhausted = result.unwrap_err();
        assert_eq!(exhausted.attempts, 3);
        assert!(exhausted.retryable);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_attempt_times_out() {
        let policy = RetryPolicy::new(1, Duration::from_millis(10))
            .with_attempt_timeout(Duration::from_secs(1));
        let result: Result<((), u32), _> = policy
            .run(|_| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;
        assert!(matches!(
            result.unwrap_err().last_error,
            BookingApiError::Timeout
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_on_second_attempt() {
        let policy = RetryPolicy::new(3, Duration::from_millis(10));
        let (value, attempts) = policy
            .run(|n| async move { if n == 1 { Err(status(500)) } else { Ok(n * 10) } })
            .await
            .unwrap();
        assert_eq!((value, attempts), (20, 2));
    }
}
