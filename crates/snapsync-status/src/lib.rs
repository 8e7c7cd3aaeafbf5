//! HTTP status API for the web UI.
//!
//! Serves worker status and last errors as JSON. Every route is read-only;
//! workers are polled on request, never pushed.

use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use snapsync_core::{ErrorBody, ErrorCode};
use snapsync_worker::{WorkerSnapshot, WorkerStatus};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Server state shared across handlers.
struct AppState {
    workers: Vec<WorkerStatus>,
}

impl AppState {
    fn find(&self, name: &str) -> Result<&WorkerStatus, AppError> {
        self.workers
            .iter()
            .find(|w| w.name() == name)
            .ok_or_else(|| AppError::WorkerNotFound(name.to_string()))
    }
}

/// Build the status router over the given workers.
pub fn router(workers: Vec<WorkerStatus>) -> Router {
    let state = Arc::new(AppState { workers });

    Router::new()
        .route("/health", get(health))
        .route("/codes", get(codes))
        .route("/workers", get(list_workers))
        .route("/workers/{name}", get(get_worker))
        .route("/workers/{name}/error", get(get_worker_error))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the status server.
///
/// # Errors
/// Returns error if binding fails or server encounters an error.
pub async fn serve(workers: Vec<WorkerStatus>, host: &str, port: u16) -> Result<()> {
    let app = router(workers);

    let addr = format!("{host}:{port}");
    info!(address = %addr, "Starting status server");

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Response types ---

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Debug, Serialize)]
struct WorkersResponse {
    workers: Vec<WorkerSnapshot>,
    count: usize,
}

#[derive(Debug, Serialize)]
struct LastErrorResponse {
    error: Option<ErrorBody>,
}

#[derive(Debug, Serialize)]
struct CodesResponse {
    codes: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

// --- Handlers ---

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn codes() -> Json<CodesResponse> {
    Json(CodesResponse {
        codes: ErrorCode::ALL.iter().map(|c| c.as_str()).collect(),
    })
}

async fn list_workers(State(state): State<Arc<AppState>>) -> Json<WorkersResponse> {
    let workers: Vec<_> = state.workers.iter().map(WorkerStatus::snapshot).collect();
    let count = workers.len();
    Json(WorkersResponse { workers, count })
}

async fn get_worker(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<WorkerSnapshot>, AppError> {
    Ok(Json(state.find(&name)?.snapshot()))
}

async fn get_worker_error(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<LastErrorResponse>, AppError> {
    let worker = state.find(&name)?;
    Ok(Json(LastErrorResponse {
        error: worker.last_error().map(|failure| failure.body()),
    }))
}

// --- Error handling ---

enum AppError {
    WorkerNotFound(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        match self {
            Self::WorkerNotFound(name) => {
                let body = Json(ErrorResponse {
                    error: format!("worker not found: {name}"),
                });
                (StatusCode::NOT_FOUND, body).into_response()
            }
        }
    }
}
