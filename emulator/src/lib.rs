//! ECS RunTask emulator
//!
//! Serves a single ECS-compatible `RunTask` endpoint on localhost. Accepted
//! requests launch a local container; everything else gets the same error
//! envelope the real API would return.

pub mod handler;
pub mod model;
pub mod responses;
pub mod routes;
pub mod validation;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;

pub use handler::RunTaskHandler;
use responses::ApiResponse;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub handler: Arc<RunTaskHandler>,
    /// Held for the whole of a request so calls are handled one at a time.
    gate: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(handler: RunTaskHandler) -> Self {
        Self {
            handler: Arc::new(handler),
            gate: Arc::new(Mutex::new(())),
        }
    }
}

/// Internal failure while serving a request
#[derive(Debug)]
pub struct AppError {
    pub status_code: StatusCode,
    pub message: String,
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError {
            status_code: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("Internal server error: {}", err),
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        ApiResponse::error(self.status_code, responses::SERVER_EXCEPTION, &self.message)
            .into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// Health check endpoint
async fn healthz() -> impl IntoResponse {
    "OK"
}

/// Create the Axum application router
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .fallback(routes::dispatch)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
