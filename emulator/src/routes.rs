//! HTTP route handlers for the emulated ECS endpoint

use crate::{responses::ApiResponse, AppResult, AppState};
use anyhow::Context;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
};
use tracing::debug;

pub const TARGET_HEADER: &str = "x-amz-target";

/// POST to any path is a `RunTask` call; other methods are refused.
pub async fn dispatch(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<ApiResponse> {
    if method != Method::POST {
        debug!("Rejecting {} {}", method, uri);
        return Ok(ApiResponse::error(
            StatusCode::METHOD_NOT_ALLOWED,
            "UnsupportedOperation",
            &format!("Unsupported method: {}", method),
        ));
    }
    run_task(state, uri, headers, body).await
}

async fn run_task(
    state: AppState,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<ApiResponse> {
    debug!("Request path: {}", uri.path());
    debug!("Request query string: {}", uri.query().unwrap_or_default());
    debug!("Request headers: {:?}", headers);
    debug!("Request body: {}", String::from_utf8_lossy(&body));

    let action = headers
        .get(TARGET_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let _guard = state.gate.lock().await;
    let handler = state.handler.clone();
    let response = tokio::task::spawn_blocking(move || handler.handle(&body, action.as_deref()))
        .await
        .context("RunTask handler panicked")?;

    Ok(response)
}
