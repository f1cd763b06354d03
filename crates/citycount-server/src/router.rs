//! Axum router wiring.

use axum::{middleware, routing::get, Router};

use crate::{app_state::AppState, http, ops};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/city/:name/temp", get(http::city::city_temp))
        .route("/metrics", get(ops::metrics))
        .route("/healthz", get(ops::healthz))
        .route("/readyz", get(ops::readyz))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            http::instrument::instrument,
        ))
        .with_state(state)
}
