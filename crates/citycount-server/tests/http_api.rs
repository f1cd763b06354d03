#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

mod common;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::Query;
use axum::http::{Request, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tower::ServiceExt;

use citycount_server::app_state::AppState;
use citycount_server::obs::{Metrics, StoreOp};
use citycount_server::pipeline::PipelineHandle;
use citycount_server::weather::CityTemp;
use citycount_server::{config, router};

use common::{wait_until, FakeStore};

const API_KEY: &str = "test-key";

async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Stand-in for the current-weather endpoint: knows two cities.
async fn fake_weather() -> SocketAddr {
    async fn current(Query(q): Query<HashMap<String, String>>) -> (StatusCode, Json<Value>) {
        if q.get("appid").map(String::as_str) != Some(API_KEY) || q.get("units").map(String::as_str) != Some("metric") {
            return (StatusCode::UNAUTHORIZED, Json(json!({ "cod": 401 })));
        }
        match q.get("q").map(String::as_str) {
            Some("london") => (StatusCode::OK, Json(json!({ "main": { "temp": 12.5 } }))),
            Some("tokyo") => (StatusCode::OK, Json(json!({ "main": { "temp": 21.0 } }))),
            _ => (StatusCode::NOT_FOUND, Json(json!({ "cod": "404", "message": "city not found" }))),
        }
    }
    serve(Router::new().route("/data/2.5/weather", get(current))).await
}

struct Harness {
    base: String,
    state: AppState,
    store: Arc<FakeStore>,
    _worker: PipelineHandle,
}

/// Stand-in that accepts the request and never answers.
async fn silent_weather() -> SocketAddr {
    async fn never() -> StatusCode {
        std::future::pending().await
    }
    serve(Router::new().route("/data/2.5/weather", get(never))).await
}

fn app_state(api_url: &str, api_key: Option<&str>) -> (AppState, Arc<FakeStore>, PipelineHandle) {
    let key_line = api_key.map(|k| format!("  api_key: \"{k}\"\n")).unwrap_or_default();
    let yaml = format!("version: 1\nweather:\n  api_url: \"{api_url}\"\n{key_line}");
    let cfg = config::load_from_str(&yaml).unwrap();

    let store = Arc::new(FakeStore::new());
    let metrics = Arc::new(Metrics::new().unwrap());
    let (state, worker) = AppState::new(cfg, store.clone(), metrics).unwrap();
    (state, store, worker)
}

async fn start(with_key: bool) -> Harness {
    let weather = fake_weather().await;
    start_against(&format!("http://{weather}"), with_key.then_some(API_KEY)).await
}

async fn start_against(api_url: &str, api_key: Option<&str>) -> Harness {
    let (state, store, worker) = app_state(api_url, api_key);
    let addr = serve(router::build_router(state.clone())).await;

    Harness {
        base: format!("http://{addr}"),
        state,
        store,
        _worker: worker,
    }
}

#[tokio::test]
async fn city_temp_returns_weather_and_counts_the_city() {
    let h = start(true).await;

    let resp = reqwest::get(format!("{}/city/london/temp", h.base)).await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({ "Temp": 12.5, "Unit": "C" }));

    assert!(wait_until(|| h.store.keys() == vec!["london"]).await);
    assert_eq!(h.state.metrics().store_op_count(StoreOp::Incr, true), 1);
    assert_eq!(h.state.pipeline().len(), 0);
}

#[tokio::test]
async fn typed_body_round_trips() {
    let h = start(true).await;
    let temp: CityTemp = reqwest::get(format!("{}/city/tokyo/temp", h.base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(temp, CityTemp { temp: 21.0, unit: "C".into() });
}

#[tokio::test]
async fn blank_city_is_rejected() {
    let h = start(true).await;

    let resp = reqwest::get(format!("{}/city/%20/temp", h.base)).await.unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    assert_eq!(resp.text().await.unwrap(), "Must provide a city name.");
    assert!(h.store.attempts().is_empty());
}

#[tokio::test]
async fn weather_failure_is_500_but_city_is_still_counted() {
    let h = start(true).await;

    let resp = reqwest::get(format!("{}/city/atlantis/temp", h.base)).await.unwrap();
    assert_eq!(resp.status().as_u16(), 500);
    assert!(resp.text().await.unwrap().contains("404"));

    assert!(wait_until(|| h.store.keys() == vec!["atlantis"]).await);
    assert_eq!(h.state.metrics().weather_status.with_label_values(&["404"]).get(), 1);
    // answered, so not a transport error
    assert_eq!(h.state.metrics().weather_errors.get(), 0);
}

#[tokio::test]
async fn unreachable_weather_service_does_not_leak_the_api_key() {
    let h = start_against("http://127.0.0.1:1", Some("SECRET-KEY-123")).await;

    let resp = reqwest::get(format!("{}/city/london/temp", h.base)).await.unwrap();
    assert_eq!(resp.status().as_u16(), 500);
    let body = resp.text().await.unwrap();
    assert!(body.contains("weather request failed"), "body: {body}");
    assert!(!body.contains("SECRET-KEY-123"), "body: {body}");
    assert!(!body.contains("appid"), "body: {body}");

    assert_eq!(h.state.metrics().weather_errors.get(), 1);
    assert!(wait_until(|| h.store.keys() == vec!["london"]).await);
}

#[tokio::test]
async fn city_name_is_counted_as_sent() {
    let h = start(true).await;

    reqwest::get(format!("{}/city/%20london/temp", h.base)).await.unwrap();

    assert!(wait_until(|| h.store.keys() == vec![" london"]).await);
}

#[tokio::test]
async fn abandoned_request_leaves_no_in_flight_count() {
    let weather = silent_weather().await;
    let (state, _store, _worker) = app_state(&format!("http://{weather}"), Some(API_KEY));
    let app = router::build_router(state.clone());

    let req = Request::builder()
        .uri("/city/london/temp")
        .body(Body::empty())
        .unwrap();
    let res = tokio::time::timeout(Duration::from_millis(200), app.oneshot(req)).await;
    assert!(res.is_err(), "upstream should still be pending");

    let m = state.metrics();
    assert_eq!(m.http_in_flight.get(), 0);
    assert_eq!(m.weather_in_flight.get(), 0);
    assert_eq!(
        m.handler_duration
            .with_label_values(&["/city/:name/temp"])
            .get_sample_count(),
        1
    );
    assert_eq!(m.weather_duration.get_sample_count(), 1);
}

#[tokio::test]
async fn missing_api_key_is_reported() {
    let h = start(false).await;

    let resp = reqwest::get(format!("{}/city/london/temp", h.base)).await.unwrap();
    assert_eq!(resp.status().as_u16(), 500);
    assert!(resp.text().await.unwrap().contains("WEATHER_API_KEY"));
}

#[tokio::test]
async fn metrics_endpoint_exposes_route_durations_and_pipeline_state() {
    let h = start(true).await;

    reqwest::get(format!("{}/city/london/temp", h.base)).await.unwrap();
    assert!(wait_until(|| h.store.keys().len() == 1).await);

    let resp = reqwest::get(format!("{}/metrics", h.base)).await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    assert!(resp
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .starts_with("text/plain"));

    let text = resp.text().await.unwrap();
    assert!(text.contains(r#"citycount_handlers_duration_seconds_count{path="/city/:name/temp"} 1"#));
    assert!(text.contains(r#"citycount_redis_worker_operations_total{operation="incr",result="ok"} 1"#));
    assert!(text.contains("citycount_redis_queue_current_length 0"));
    assert!(text.contains("citycount_weather_request_duration_seconds_count 1"));
}

#[tokio::test]
async fn readiness_flips_when_draining() {
    let h = start(true).await;

    let live = reqwest::get(format!("{}/healthz", h.base)).await.unwrap();
    assert_eq!(live.text().await.unwrap(), "ok");

    let ready = reqwest::get(format!("{}/readyz", h.base)).await.unwrap();
    assert_eq!(ready.status().as_u16(), 200);

    h.state.set_draining();
    let ready = reqwest::get(format!("{}/readyz", h.base)).await.unwrap();
    assert_eq!(ready.status().as_u16(), 503);
    assert_eq!(ready.text().await.unwrap(), "draining");
}

#[tokio::test]
async fn readiness_fails_once_the_worker_has_stopped() {
    let weather = fake_weather().await;
    let (state, _store, worker) = app_state(&format!("http://{weather}"), Some(API_KEY));
    let base = format!("http://{}", serve(router::build_router(state.clone())).await);

    worker.shutdown().await;

    let ready = reqwest::get(format!("{base}/readyz")).await.unwrap();
    assert_eq!(ready.status().as_u16(), 503);
    assert_eq!(ready.text().await.unwrap(), "redis worker stopped");
}
