//! HTTP integration tests for the prediction endpoint
//!
//! Tests verify:
//! 1. POST /predict returns 200 with a predicted bill for a valid request
//! 2. Every failure returns 500 with {success: false, error}
//! 3. Cross-origin requests are allowed from any origin
//! 4. Only POST is routed
//! 5. An oversized body gets the same failure shape
//!
//! Each test starts the real router on an ephemeral local port, backed by
//! the fixture artifacts, and talks to it with a blocking HTTP client.
//!
//! Run with: cargo test --test http_integration

use std::net::SocketAddr;
use std::path::Path;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use energy_bill_service::artifacts::ArtifactStore;
use energy_bill_service::model::PredictionResponse;
use energy_bill_service::server::{self, AppState};
use serde_json::json;

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

/// Starts the service on its own runtime thread and returns its address.
///
/// The server lives until the test process exits.
fn start_server() -> SocketAddr {
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures");
    let store = ArtifactStore::load(
        &fixtures.join("energy_bill_model.json"),
        &fixtures.join("scaler.json"),
    )
    .expect("fixture artifacts should load");

    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .expect("Failed to build runtime");
        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                .await
                .expect("Failed to bind ephemeral port");
            tx.send(listener.local_addr().unwrap()).unwrap();
            let state = AppState::new(Arc::new(store));
            server::run(listener, state, std::future::pending()).await.unwrap();
        });
    });

    rx.recv().expect("server failed to start")
}

fn client() -> reqwest::blocking::Client {
    reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(10))
        .build()
        .unwrap()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn test_predict_success() {
    let addr = start_server();
    let response = client()
        .post(format!("http://{}/predict", addr))
        .json(&json!({"home_size": 1500, "num_appliances": 8, "month": 3}))
        .send()
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body: PredictionResponse = response.json().unwrap();
    assert!(body.success);
    assert!(body.predicted_bill.unwrap().is_finite());
    assert!(body.error.is_none());
}

#[test]
fn test_predict_failures_are_500() {
    let addr = start_server();
    let url = format!("http://{}/predict", addr);
    let http = client();

    let bodies = [
        json!({"num_appliances": 8, "month": 3}),
        json!({"home_size": 1500, "num_appliances": 8, "month": "march"}),
        json!([1500, 8, 3]),
    ];
    for body in &bodies {
        let response = http.post(&url).json(body).send().unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR, "{}", body);
        let parsed: PredictionResponse = response.json().unwrap();
        assert!(!parsed.success);
        assert!(parsed.error.is_some());
    }

    // Not JSON at all, and no content type: same uniform failure shape
    let response = http.post(&url).body("home_size=1500").send().unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    let parsed: PredictionResponse = response.json().unwrap();
    assert!(!parsed.success);
}

#[test]
fn test_oversized_body_keeps_failure_shape() {
    let addr = start_server();
    let padding = "x".repeat(server::MAX_BODY_BYTES * 2);
    let response = client()
        .post(format!("http://{}/predict", addr))
        .json(&json!({"home_size": 1500, "num_appliances": 8, "month": 3, "notes": padding}))
        .send()
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    let parsed: PredictionResponse = response.json().unwrap();
    assert!(!parsed.success);
    let error = parsed.error.unwrap();
    assert!(error.starts_with("Invalid request body"), "{}", error);
}

#[test]
fn test_cors_allows_any_origin() {
    let addr = start_server();
    let url = format!("http://{}/predict", addr);
    let http = client();

    let response = http
        .post(&url)
        .header("Origin", "http://localhost:5173")
        .json(&json!({"home_size": 1500, "num_appliances": 8, "month": 3}))
        .send()
        .unwrap();
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );

    // Browser preflight for a JSON POST
    let preflight = http
        .request(reqwest::Method::OPTIONS, &url)
        .header("Origin", "http://example.com")
        .header("Access-Control-Request-Method", "POST")
        .header("Access-Control-Request-Headers", "content-type")
        .send()
        .unwrap();
    assert!(preflight.status().is_success());
    assert!(preflight.headers().contains_key("access-control-allow-methods"));
}

#[test]
fn test_only_post_is_routed() {
    let addr = start_server();
    let http = client();

    let get = http.get(format!("http://{}/predict", addr)).send().unwrap();
    assert_eq!(get.status(), reqwest::StatusCode::METHOD_NOT_ALLOWED);

    let other = http.post(format!("http://{}/forecast", addr)).send().unwrap();
    assert_eq!(other.status(), reqwest::StatusCode::NOT_FOUND);
}
