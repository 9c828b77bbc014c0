//! End-to-end smoke tests for the full coverctld stack.
//!
//! Each test starts real cover controllers driving the virtual actuator and
//! exercises them through the axum router via `tower::ServiceExt::oneshot`;
//! no TCP port is bound. The clock is pinned to 22:00 UTC so the scheduled
//! closing window is active.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use chrono::{TimeZone, Utc};
use http_body_util::BodyExt;
use tower::ServiceExt;

use coverctl_adapter_http_axum::router;
use coverctl_adapter_http_axum::state::AppState;
use coverctl_adapter_virtual::VirtualActuator;
use coverctl_app::controller::ControllerSettings;
use coverctl_app::event_bus::InProcessEventBus;
use coverctl_app::ports::Clock;
use coverctl_app::sensor_store::SensorStore;
use coverctl_app::services::cover_service::{CoverService, ServiceRuntime};
use coverctl_app::services::diagnostics_board::DiagnosticsBoard;
use coverctl_domain::config::CoverConfig;
use coverctl_domain::id::CoverId;
use coverctl_domain::site::Site;
use coverctl_domain::time::Timestamp;

struct EveningClock;

impl Clock for EveningClock {
    fn now(&self) -> Timestamp {
        Utc.with_ymd_and_hms(2024, 5, 6, 22, 0, 0).unwrap()
    }
}

const COVERS: &str = r#"
    [[covers]]
    id = "office"
    name = "Office"

    [[covers.opening]]
    start = "07:00"
    end = "21:00"

    [[covers.closing]]
    start = "21:00"
    end = "07:00"

    [covers.shading]
    brightness_sensor = "sensor.office_lux"

    [[covers.contacts]]
    entity = "binary_sensor.office_window"
    role = "tilt"
"#;

#[derive(serde::Deserialize)]
struct CoversFile {
    covers: Vec<CoverConfig>,
}

/// Build a fully-wired router plus the actuator behind it.
fn app() -> (axum::Router, VirtualActuator) {
    let CoversFile { covers } = toml::from_str(COVERS).expect("cover config should parse");
    let event_bus = Arc::new(InProcessEventBus::new(64));
    let actuator = VirtualActuator::new();

    let service = CoverService::start(
        covers,
        &Site::default(),
        actuator.clone(),
        ServiceRuntime {
            sensors: SensorStore::new(),
            board: Arc::new(DiagnosticsBoard::new(Arc::clone(&event_bus))),
            clock: Arc::new(EveningClock),
            settings: ControllerSettings::default(),
            enabled: true,
        },
    )
    .expect("service should start");

    let state = AppState::new(Arc::new(service), event_bus);
    (router::build(state), actuator)
}

fn request(method: Method, uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json(resp: axum::response::Response) -> serde_json::Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Poll the cover until its diagnostics satisfy `accept`.
async fn wait_for_cover(
    app: &axum::Router,
    accept: impl Fn(&serde_json::Value) -> bool,
) -> serde_json::Value {
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let resp = app
                .clone()
                .oneshot(request(Method::GET, "/api/covers/office", ""))
                .await
                .unwrap();
            let body = json(resp).await;
            if accept(&body["diagnostics"]) {
                return body;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("cover should reach the expected state")
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_return_ok_when_health_check_called() {
    let (app, _) = app();
    let resp = app
        .oneshot(request(Method::GET, "/health", ""))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Scheduling
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_close_cover_inside_closing_window() {
    let (app, actuator) = app();

    let body = wait_for_cover(&app, |diag| !diag.is_null()).await;
    let diag = &body["diagnostics"];
    assert_eq!(diag["target_action"], "close");
    assert_eq!(diag["reason"], "scheduled_close");
    assert_eq!(diag["state"], "closed");
    assert_eq!(diag["dispatched"], true);
    assert_eq!(
        actuator.position(&CoverId::new("office").unwrap()),
        Some(0)
    );
}

// ---------------------------------------------------------------------------
// Ventilation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_tilt_when_window_contact_opens() {
    let (app, actuator) = app();
    wait_for_cover(&app, |diag| diag["reason"] == "scheduled_close").await;

    let resp = app
        .clone()
        .oneshot(request(
            Method::PUT,
            "/api/sensors/binary_sensor.office_window",
            r#"{"type": "on"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json(resp).await["triggered"], serde_json::json!(["office"]));

    let body = wait_for_cover(&app, |diag| diag["target_action"] == "tilt").await;
    assert_eq!(body["diagnostics"]["state"], "ventilating");
    assert_eq!(
        actuator.position(&CoverId::new("office").unwrap()),
        Some(30)
    );
}

// ---------------------------------------------------------------------------
// Manual override
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_hold_position_while_manual_override_active() {
    let (app, actuator) = app();
    wait_for_cover(&app, |diag| diag["reason"] == "scheduled_close").await;

    let resp = app
        .clone()
        .oneshot(request(
            Method::POST,
            "/api/covers/office/manual_override",
            r#"{"minutes": 60}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json(resp).await["until"], "2024-05-06T23:00:00Z");

    app.clone()
        .oneshot(request(
            Method::PUT,
            "/api/sensors/binary_sensor.office_window",
            r#"{"type": "on"}"#,
        ))
        .await
        .unwrap();

    let body = wait_for_cover(&app, |diag| diag["reason"] == "manual_override_active").await;
    assert_eq!(body["diagnostics"]["state"], "paused");
    assert_eq!(body["manual_override_until"], "2024-05-06T23:00:00Z");
    assert_eq!(actuator.commands().len(), 1);
}

// ---------------------------------------------------------------------------
// Actuator failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_report_dispatch_failure_and_retry_on_next_evaluation() {
    let (app, actuator) = app();
    let office = CoverId::new("office").unwrap();
    wait_for_cover(&app, |diag| diag["reason"] == "scheduled_close").await;

    // Forget the applied close, then fail the resend.
    actuator.set_failing(&office, true);
    app.clone()
        .oneshot(request(Method::POST, "/api/covers/office/moved", ""))
        .await
        .unwrap();
    app.clone()
        .oneshot(request(
            Method::DELETE,
            "/api/covers/office/manual_override",
            "",
        ))
        .await
        .unwrap();

    let body = wait_for_cover(&app, |diag| diag["reason"] == "dispatch_failed").await;
    assert_eq!(body["diagnostics"]["decision_reason"], "scheduled_close");
    assert_eq!(body["diagnostics"]["dispatched"], false);

    actuator.set_failing(&office, false);
    app.clone()
        .oneshot(request(Method::POST, "/api/covers/office/evaluate", ""))
        .await
        .unwrap();
    wait_for_cover(&app, |diag| diag["dispatched"] == true).await;
    assert_eq!(actuator.commands().len(), 2);
}

// ---------------------------------------------------------------------------
// Engine switch
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_report_engine_state() {
    let (app, _) = app();

    let resp = app
        .clone()
        .oneshot(request(Method::PUT, "/api/enabled", r#"{"enabled": false}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .oneshot(request(Method::GET, "/api/enabled", ""))
        .await
        .unwrap();
    assert_eq!(json(resp).await["enabled"], false);
}

// ---------------------------------------------------------------------------
// Diagnostics stream
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_stream_diagnostics_after_evaluation() {
    let (app, _) = app();
    wait_for_cover(&app, |diag| !diag.is_null()).await;

    let resp = app
        .clone()
        .oneshot(request(Method::GET, "/api/diagnostics/stream", ""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let mut body = resp.into_body();

    app.clone()
        .oneshot(request(Method::POST, "/api/covers/office/evaluate", ""))
        .await
        .unwrap();

    let frame = tokio::time::timeout(Duration::from_secs(2), body.frame())
        .await
        .expect("a diagnostics frame should arrive")
        .expect("stream should stay open")
        .unwrap();
    let text = String::from_utf8(frame.into_data().unwrap().to_vec()).unwrap();
    assert!(text.contains("event: office"));
    assert!(text.contains("\"reason\":\"scheduled_close\""));
}
