use axum::extract::{MatchedPath, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use tokio::time::Instant;

use crate::app_state::AppState;
use crate::obs::InFlight;

/// Per-route duration histogram, in-flight gauge and a debug access line.
///
/// The gauge and histogram settle even when the request future is dropped
/// before a response exists.
pub async fn instrument(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| req.uri().path().to_owned());
    let method = req.method().clone();

    let metrics = state.metrics();
    let started = Instant::now();
    let in_flight = InFlight::start(
        &metrics.http_in_flight,
        metrics.handler_duration.with_label_values(&[path.as_str()]),
    );
    let resp = next.run(req).await;
    drop(in_flight);

    tracing::debug!(%method, %path, status = resp.status().as_u16(), elapsed = ?started.elapsed(), "request served");
    resp
}
