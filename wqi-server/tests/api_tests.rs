//! HTTP API integration tests

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use wqi_common::estimator::Calibration;
use wqi_common::{RuleBasedEstimator, RuleTable};
use wqi_server::acquisition::{AcquisitionService, DisabledSource, LiveTierSettings};
use wqi_server::config::RemoteConfig;
use wqi_server::log::PersistenceLog;
use wqi_server::{build_router, AppState};

fn test_app(dir: &std::path::Path, calibration: Calibration) -> axum::Router {
    let settings = LiveTierSettings {
        timeout: Duration::from_millis(200),
        ..LiveTierSettings::from(&RemoteConfig::default())
    };
    let service = AcquisitionService::new(
        Arc::new(DisabledSource),
        settings,
        PersistenceLog::new(dir.join("readings.csv")),
        Arc::new(RuleBasedEstimator::new(Arc::new(RuleTable::default()))),
        calibration,
        Some(42),
    );
    build_router(AppState::new(Arc::new(service), false))
}

async fn send(app: axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn post_json(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/predict")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn ideal() -> Value {
    json!({
        "ph": 7.0, "turbidity": 2.0, "tds": 200, "do": 8.0,
        "temp": 20, "conductivity": 500, "chlorine": 0.5, "nitrate": 3.0
    })
}

#[tokio::test]
async fn test_predict_ideal_reading() {
    let dir = tempfile::tempdir().unwrap();
    let (status, body) = send(test_app(dir.path(), Calibration::default()), post_json(&ideal().to_string())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["wqi"], 100);
    assert_eq!(body["assessment"], "Excellent Quality (Safe)");
}

#[tokio::test]
async fn test_predict_accepts_numeric_strings() {
    let dir = tempfile::tempdir().unwrap();
    let mut reading = ideal();
    reading["turbidity"] = json!("50");
    let (status, body) = send(test_app(dir.path(), Calibration::default()), post_json(&reading.to_string())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["wqi"], 80);
    assert_eq!(body["assessment"], "Good Quality (Minor Issues)");
}

#[tokio::test]
async fn test_predict_applies_calibration() {
    let dir = tempfile::tempdir().unwrap();
    let calibration = Calibration {
        calibration_scale: 0.75,
        calibration_offset: 5.0,
    };
    let (_, body) = send(test_app(dir.path(), calibration), post_json(&ideal().to_string())).await;
    assert_eq!(body["wqi"], 80);
}

#[tokio::test]
async fn test_predict_missing_field_is_400_with_details() {
    let dir = tempfile::tempdir().unwrap();
    let mut reading = ideal();
    reading.as_object_mut().unwrap().remove("do");
    reading["ph"] = json!("acidic");
    let (status, body) = send(test_app(dir.path(), Calibration::default()), post_json(&reading.to_string())).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_INPUT");
    let message = body["error"]["message"].as_str().unwrap();
    assert!(message.contains("'do'"), "{}", message);
    assert!(message.contains("'ph'"), "{}", message);
}

#[tokio::test]
async fn test_predict_rejects_non_object_and_bad_json() {
    let dir = tempfile::tempdir().unwrap();
    let (status, body) = send(test_app(dir.path(), Calibration::default()), post_json("[1, 2, 3]")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    let (status, _) = send(test_app(dir.path(), Calibration::default()), post_json("{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_live_data_simulates_then_serves_cached() {
    let dir = tempfile::tempdir().unwrap();
    let request = || Request::builder().uri("/api/live-data").body(Body::empty()).unwrap();

    let (status, body) = send(test_app(dir.path(), Calibration::default()), request()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["metadata"]["source"], "simulated");
    assert!(body["wqi"].as_u64().unwrap() <= 100);
    assert!(body["features"]["turbidity"].as_f64().unwrap() >= 0.1);
    assert!(body["features"]["do"].as_f64().unwrap() >= 1.0);

    // The simulated row was logged, so the next request is served from cache
    let (_, cached) = send(test_app(dir.path(), Calibration::default()), request()).await;
    assert_eq!(cached["metadata"]["source"], "cached");
    assert_eq!(cached["features"], body["features"]);
    assert_eq!(cached["metadata"]["timestamp"], body["metadata"]["timestamp"]);
}

#[tokio::test]
async fn test_health_reports_module_and_estimator() {
    let dir = tempfile::tempdir().unwrap();
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send(test_app(dir.path(), Calibration::default()), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["module"], "wqi-server");
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["model_loaded"], false);
    assert_eq!(body["estimator"], "rules");
    assert!(body["build"]["git_hash"].is_string());
    assert!(body["uptime_seconds"].is_u64());
}
