//! HTTP surface: `POST /predict` with permissive CORS, plus the startup
//! sequence that loads artifacts before anything is bound.
//!
//! The handler body is read as raw bytes and parsed by `predict`, so a
//! malformed or oversized body gets the same `{success: false, error}`
//! shape as any other failure instead of a framework rejection.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use crate::artifacts::{ArtifactStore, InferenceBackend};
use crate::config::ServiceConfig;
use crate::logging::{self, Component};
use crate::model::{PredictError, PredictionResponse, StartupError};
use crate::predict;

/// Largest accepted request body. The form posts three numbers.
pub const MAX_BODY_BYTES: usize = 16 * 1024;

// ---------- Server state ----------

/// Shared, read-only after startup apart from the request counter.
#[derive(Clone)]
pub struct AppState {
    backend: Arc<dyn InferenceBackend>,
    requests: Arc<AtomicU64>,
}

impl AppState {
    pub fn new(backend: Arc<dyn InferenceBackend>) -> Self {
        Self {
            backend,
            requests: Arc::new(AtomicU64::new(0)),
        }
    }

    fn next_request_id(&self) -> String {
        format!("req-{}", self.requests.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

// ---------- Routes ----------

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/predict", post(predict_handler))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn predict_handler(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> (StatusCode, Json<PredictionResponse>) {
    let request_id = state.next_request_id();

    let result = match body {
        Ok(body) => {
            logging::debug(
                Component::Http,
                Some(&request_id),
                &format!("POST /predict ({} bytes)", body.len()),
            );
            predict::predict_bill(&body, state.backend.as_ref())
        }
        Err(rejection) => Err(PredictError::InvalidBody(rejection.body_text())),
    };
    match &result {
        Ok(bill) => logging::info(
            Component::Predict,
            Some(&request_id),
            &format!("predicted bill {:.2}", bill),
        ),
        Err(e) => logging::log_predict_failure(&request_id, e),
    }

    let (status, response) = predict::respond(result);
    (status, Json(response))
}

// ---------- Serving ----------

/// Serves on an already-bound listener until `shutdown` resolves.
pub async fn run<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        logging::info(Component::Http, None, &format!("listening on http://{}", addr));
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

/// Loads the artifacts, then binds and serves until `shutdown` resolves.
///
/// Artifact loading finishes before the listener is bound: a missing or
/// corrupt artifact returns `StartupError::Artifacts` and the port is never
/// opened.
pub async fn start<F>(config: &ServiceConfig, shutdown: F) -> Result<(), StartupError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let model_path = config.model_path();
    let scaler_path = config.scaler_path();
    let store = ArtifactStore::load(&model_path, &scaler_path).map_err(|e| {
        logging::error(Component::Artifacts, None, &format!("refusing to start: {}", e));
        e
    })?;
    logging::info(
        Component::Artifacts,
        None,
        &format!("loaded model {} and scaler {}", model_path.display(), scaler_path.display()),
    );

    let addr = config.socket_addr()?;
    let listener = TcpListener::bind(addr).await.map_err(|e| {
        logging::error(Component::Http, None, &format!("failed to bind {}: {}", addr, e));
        e
    })?;

    let backend: Arc<dyn InferenceBackend> = Arc::new(store);
    run(listener, AppState::new(backend), shutdown).await?;
    Ok(())
}

/// Resolves on Ctrl-C.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        logging::error(Component::System, None, &format!("failed to listen for Ctrl-C: {}", e));
        // No signal handler: serve until the process is killed.
        std::future::pending::<()>().await;
    }
    logging::info(Component::System, None, "shutdown requested");
}

// ---------- Tests ----------
