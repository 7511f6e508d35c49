use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use booking_core::model::{BookingId, BookingReceipt, Field};
use booking_core::{ErrorCode, SubmissionPayload, ValidationError};

use crate::config::BookingConfig;
use crate::error::{BookingApiError, ConfigError};

pub const SUBMIT_PATH: &str = "forms/submit";

/// One attempt at persisting a booking.
#[async_trait]
pub trait BookingApi: Send + Sync {
    /// Send `payload` once. Retrying is the caller's business.
    ///
    /// # Errors
    ///
    /// Returns `BookingApiError` for transport failures, non-success statuses,
    /// explicit rejections, and unreadable bodies.
    async fn submit(&self, payload: &SubmissionPayload) -> Result<BookingReceipt, BookingApiError>;
}

/// `BookingApi` backed by `POST {base}/forms/submit`.
#[derive(Clone, Debug)]
pub struct HttpBookingApi {
    client: Client,
    url: String,
}

impl HttpBookingApi {
    /// # Errors
    ///
    /// Returns `ConfigError` if the base URL is invalid or the HTTP client
    /// cannot be built.
    pub fn new(config: &BookingConfig) -> Result<Self, ConfigError> {
        config.check()?;
        let client = Client::builder().build()?;
        Ok(Self::with_client(client, config))
    }

    #[must_use]
    pub fn with_client(client: Client, config: &BookingConfig) -> Self {
        Self {
            client,
            url: config.endpoint(SUBMIT_PATH),
        }
    }
}

#[async_trait]
impl BookingApi for HttpBookingApi {
    async fn submit(&self, payload: &SubmissionPayload) -> Result<BookingReceipt, BookingApiError> {
        debug!(url = %self.url, submission_id = %payload.submission_id(), "posting booking");
        let response = self.client.post(&self.url).json(payload).send().await?;
        let status = response.status();
        let body = response.text().await?;
        parse_response(status, &body)
    }
}

//
// ─── RESPONSE ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ApiData {
    #[serde(default, alias = "bookingId")]
    booking_id: Option<String>,
    #[serde(default, alias = "nextSteps")]
    next_steps: Vec<String>,
}

/// The `error` member, read leniently: servers send an object, a bare code
/// string, or nothing at all.
#[derive(Debug, Default)]
struct ApiErrorBody {
    code: Option<String>,
    message: Option<String>,
    validation_errors: Vec<ValidationError>,
}

impl ApiErrorBody {
    fn read(error: Option<&Value>) -> Self {
        match error {
            Some(Value::String(code)) => Self {
                code: Some(code.clone()),
                ..Self::default()
            },
            Some(Value::Object(body)) => {
                if let Some(details) = body.get("details") {
                    debug!(%details, "booking error details");
                }
                let entries = body
                    .get("validationErrors")
                    .or_else(|| body.get("validation_errors"))
                    .and_then(Value::as_array);
                Self {
                    code: string_member(body, &["code"]),
                    message: string_member(body, &["message"]),
                    validation_errors: entries
                        .map(|entries| entries.iter().filter_map(field_error).collect())
                        .unwrap_or_default(),
                }
            }
            _ => Self::default(),
        }
    }
}

fn string_member(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| object.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

/// One server field error, kept only when it names a field this form knows.
fn field_error(entry: &Value) -> Option<ValidationError> {
    let entry = entry.as_object()?;
    let field = string_member(entry, &["field", "path", "param"])?
        .parse::<Field>()
        .ok()?;
    let message = string_member(entry, &["message", "msg"])?;
    Some(ValidationError::new(field, ErrorCode::InvalidFormat, message))
}

/// Turns a raw HTTP answer into a receipt or a classified error.
///
/// # Errors
///
/// Returns `Status` for non-2xx codes, `Rejected` for `success: false`, and
/// `Malformed` when a 2xx body is unreadable or lacks a booking id.
pub fn parse_response(status: StatusCode, body: &str) -> Result<BookingReceipt, BookingApiError> {
    let parsed = serde_json::from_str::<ApiResponse>(body);

    if !status.is_success() {
        let (code, message, validation_errors) = match parsed {
            Ok(response) => {
                let error = ApiErrorBody::read(response.error.as_ref());
                (
                    error.code,
                    error.message.or(response.message),
                    error.validation_errors,
                )
            }
            Err(_) => (None, None, Vec::new()),
        };
        return Err(BookingApiError::Status {
            status,
            code,
            message,
            validation_errors,
        });
    }

    let response = parsed.map_err(|e| BookingApiError::Malformed(e.to_string()))?;
    match response.success {
        Some(true) => {}
        Some(false) => {
            let error = ApiErrorBody::read(response.error.as_ref());
            let message = error
                .message
                .or(response.message)
                .unwrap_or_else(|| "Booking was not accepted".to_string());
            return Err(BookingApiError::Rejected {
                code: error.code,
                message,
                validation_errors: error.validation_errors,
            });
        }
        None => {
            return Err(BookingApiError::Malformed(
                "response has no success flag".into(),
            ));
        }
    }

    let data = response
        .data
        .ok_or_else(|| BookingApiError::Malformed("response has no data".into()))?;
    let data: ApiData =
        serde_json::from_value(data).map_err(|e| BookingApiError::Malformed(e.to_string()))?;
    let booking_id = data
        .booking_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| BookingApiError::Malformed("response has no booking id".into()))?;

    Ok(BookingReceipt {
        booking_id: BookingId::new(booking_id),
        message: response.message.unwrap_or_default(),
        follow_up: data.next_steps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_camel_case_booking_id() {
        let receipt = parse_response(
            StatusCode::OK,
            r#"{"success":true,"message":"Booked","data":{"bookingId":"BK-7","next_steps":["Check your inbox"]}}"#,
        )
        .unwrap();
        assert_eq!(receipt.booking_id.as_str(), "BK-7");
        assert_eq!(receipt.message, "Booked");
        assert_eq!(receipt.follow_up, vec!["Check your inbox".to_string()]);
    }

    #[test]
    fn success_false_is_rejection() {
        let err = parse_response(
            StatusCode::OK,
            r#"{"success":false,"message":"Nope","error":{"code":"DUPLICATE","message":"Already booked"}}"#,
        )
        .unwrap_err();
        assert_eq!(err.server_code(), Some("DUPLICATE"));
        assert_eq!(err.server_message(), Some("Already booked"));
    }

    #[test]
    fn unprocessable_keeps_known_field_errors() {
        let err = parse_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"success":false,"message":"Invalid","error":{"code":"VALIDATION_ERROR","validationErrors":[
                {"field":"studentEmail","message":"Email already registered"},
                {"field":"mystery","message":"ignored"}]}}"#,
        )
        .unwrap_err();
        let BookingApiError::Status {
            status,
            validation_errors,
            message,
            ..
        } = err
        else {
            panic!("expected status error");
        };
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(message.as_deref(), Some("Invalid"));
        assert_eq!(validation_errors.len(), 1);
        assert_eq!(validation_errors[0].field, Field::StudentEmail);
    }

    #[test]
    fn unprocessable_without_error_message_keeps_top_level_message() {
        let err = parse_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"success":false,"message":"Email already registered","error":{"validationErrors":[{"path":"studentEmail","msg":"taken"}]}}"#,
        )
        .unwrap_err();
        assert_eq!(err.server_message(), Some("Email already registered"));
        assert_eq!(err.server_code(), None);
        let errors = err.validation_errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, Field::StudentEmail);
        assert_eq!(errors[0].message, "taken");
    }

    #[test]
    fn string_error_is_read_as_code() {
        let err = parse_response(
            StatusCode::BAD_REQUEST,
            r#"{"message":"Captcha verification failed","error":"CAPTCHA_INVALID"}"#,
        )
        .unwrap_err();
        assert_eq!(err.server_message(), Some("Captcha verification failed"));
        assert_eq!(err.server_code(), Some("CAPTCHA_INVALID"));
        assert!(err.validation_errors().is_empty());
    }

    #[test]
    fn malformed_field_errors_are_skipped() {
        let err = parse_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"success":false,"error":{"message":"Invalid","validationErrors":[
                {"field":"studentEmail"},
                "oops",
                {"field":"city","message":"Unknown city"}]}}"#,
        )
        .unwrap_err();
        assert_eq!(err.server_message(), Some("Invalid"));
        let errors = err.validation_errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, Field::City);
    }

    #[test]
    fn garbage_bodies() {
        assert!(matches!(
            parse_response(StatusCode::OK, "<html>"),
            Err(BookingApiError::Malformed(_))
        ));
        assert!(matches!(
            parse_response(StatusCode::OK, r#"{"success":true,"data":{}}"#),
            Err(BookingApiError::Malformed(_))
        ));
        assert!(matches!(
            parse_response(StatusCode::OK, r#"{"data":{"bookingId":"BK-1"}}"#),
            Err(BookingApiError::Malformed(_))
        ));
        assert!(matches!(
            parse_response(StatusCode::BAD_GATEWAY, "<html>"),
            Err(BookingApiError::Status { code: None, .. })
        ));
    }
}
