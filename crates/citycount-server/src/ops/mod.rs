//! Operational endpoints for citycount.
//!
//! `/healthz` answers as long as the process serves HTTP. `/readyz` turns 503
//! once shutdown begins, or when the redis worker has exited and city counts
//! would only be dropped. `/metrics` renders the service registry, including
//! the pool and queue-length collectors sampled at scrape time.

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use prometheus::{Encoder, TextEncoder};

use crate::app_state::AppState;
use crate::http::ApiError;

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    if state.is_draining() {
        (StatusCode::SERVICE_UNAVAILABLE, "draining")
    } else if !state.pipeline().is_accepting() {
        (StatusCode::SERVICE_UNAVAILABLE, "redis worker stopped")
    } else {
        (StatusCode::OK, "ready")
    }
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    match state.metrics().render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, TextEncoder::new().format_type().to_owned())],
            body,
        )
            .into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}
