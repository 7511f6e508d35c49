mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use booking_core::SubmissionContext;
use booking_core::time::fixed_clock;
use booking_core::{Validator, model::Field};
use common::fill_jane;
use services::{
    BookingConfig, BookingFormController, FailureKind, HttpBookingApi, HttpCourseCatalog,
    RetryPolicy, SubmissionPipeline, SubmitOutcome,
};

#[derive(Clone, Default)]
struct ServerState {
    received: Arc<Mutex<Vec<Value>>>,
    hits: Arc<AtomicU32>,
}

async fn accept_booking(State(state): State<ServerState>, Json(body): Json<Value>) -> Json<Value> {
    state.hits.fetch_add(1, Ordering::SeqCst);
    state.received.lock().await.push(body);
    Json(json!({
        "success": true,
        "message": "Your demo is booked",
        "data": { "bookingId": "BK-2024-0001", "next_steps": ["Watch your inbox"] }
    }))
}

async fn reject_email(State(state): State<ServerState>) -> (StatusCode, Json<Value>) {
    state.hits.fetch_add(1, Ordering::SeqCst);
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({
            "success": false,
            "message": "Validation failed",
            "error": {
                "code": "VALIDATION_ERROR",
                "message": "Email is already registered",
                "validationErrors": [
                    { "field": "studentEmail", "message": "Email is already registered" }
                ]
            }
        })),
    )
}

async fn always_down(State(state): State<ServerState>) -> StatusCode {
    state.hits.fetch_add(1, Ordering::SeqCst);
    StatusCode::SERVICE_UNAVAILABLE
}

async fn wrapped_courses() -> Json<Value> {
    Json(json!({ "data": [
        { "id": "ai", "title": "AI & Data Science" },
        { "id": "web", "title": "Web Development" }
    ]}))
}

async fn spawn_server(app: Router<ServerState>, state: ServerState) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let app = app.with_state(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

fn http_controller(base_url: &str) -> BookingFormController {
    let config = BookingConfig::new(base_url);
    let client = reqwest::Client::builder()
        .no_proxy()
        .build()
        .expect("client");
    let api = HttpBookingApi::with_client(client.clone(), &config);
    let catalog = HttpCourseCatalog::with_client(client, &config);
    let policy = RetryPolicy::new(3, Duration::from_millis(10))
        .with_attempt_timeout(Duration::from_secs(5));
    BookingFormController::new(
        Validator::new(fixed_clock()),
        SubmissionPipeline::new(Arc::new(api), policy),
    )
    .with_catalog(Arc::new(catalog))
}

#[tokio::test]
async fn jane_doe_books_over_http() {
    let state = ServerState::default();
    let app = Router::new()
        .route("/forms/submit", post(accept_booking))
        .route("/courses", get(wrapped_courses));
    let base = spawn_server(app, state.clone()).await;

    let form = http_controller(&base);
    let courses = form.load_courses().await;
    assert_eq!(courses.options().len(), 2);
    fill_jane(&form);

    let context = SubmissionContext {
        utm: booking_core::UtmParams::parse("https://x.com/book?utm_source=google&utm_medium=cpc")
            .expect("landing url"),
        ..SubmissionContext::default()
    };
    let outcome = form.submit(&context).await;

    let SubmitOutcome::Submitted(receipt) = outcome else {
        panic!("expected booking, got {outcome:?}");
    };
    assert_eq!(receipt.booking_id.as_str(), "BK-2024-0001");
    assert_eq!(receipt.follow_up, vec!["Watch your inbox".to_string()]);

    let received = state.received.lock().await;
    let body = &received[0];
    assert_eq!(body["form_type"], "demo_booking");
    assert_eq!(body["is_student_under_16"], false);
    assert_eq!(
        body["student_details"]["preferred_course"],
        json!(["AI & Data Science"])
    );
    assert_eq!(body["contact_info"]["first_name"], "Jane");
    assert_eq!(body["contact_info"]["country"], "India");
    assert_eq!(body["demo_session_details"]["timezone"], "Asia/Kolkata");
    assert_eq!(body["submission_metadata"]["utm_source"], "google");
    assert!(body.get("parent_details").is_none());
}

#[tokio::test]
async fn server_validation_error_lands_on_field() {
    let state = ServerState::default();
    let app = Router::new().route("/forms/submit", post(reject_email));
    let base = spawn_server(app, state.clone()).await;

    let form = http_controller(&base);
    fill_jane(&form);
    let outcome = form.submit(&SubmissionContext::default()).await;

    let SubmitOutcome::Failed(failure) = outcome else {
        panic!("expected failure, got {outcome:?}");
    };
    assert_eq!(failure.kind, FailureKind::Rejected);
    assert_eq!(failure.code, "VALIDATION_ERROR");
    assert_eq!(failure.message, "Email is already registered");
    assert_eq!(state.hits.load(Ordering::SeqCst), 1);
    assert_eq!(
        form.snapshot().errors().message(Field::StudentEmail),
        Some("Email is already registered")
    );
}

#[tokio::test]
async fn unavailable_backend_is_retried_then_reported() {
    let state = ServerState::default();
    let app = Router::new().route("/forms/submit", post(always_down));
    let base = spawn_server(app, state.clone()).await;

    let form = http_controller(&base);
    fill_jane(&form);
    let outcome = form.submit(&SubmissionContext::default()).await;

    let SubmitOutcome::Failed(failure) = outcome else {
        panic!("expected failure, got {outcome:?}");
    };
    assert_eq!(failure.kind, FailureKind::Exhausted);
    assert_eq!(failure.attempts, 3);
    assert_eq!(state.hits.load(Ordering::SeqCst), 3);
    assert!(!form.snapshot().is_submitting());
}

#[tokio::test]
async fn missing_courses_endpoint_degrades() {
    let state = ServerState::default();
    let app = Router::new().route("/forms/submit", post(accept_booking));
    let base = spawn_server(app, state).await;

    let form = http_controller(&base);
    let courses = form.load_courses().await;
    assert!(courses.manual_entry());
}
