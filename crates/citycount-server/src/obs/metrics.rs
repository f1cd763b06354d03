//! Metrics registry for the service.
//!
//! Every metric is registered exactly once against a private `Registry` when
//! `Metrics::new` runs. A second registration of the same name is rejected by
//! the registry and surfaces as a startup error.

use prometheus::core::Collector;
use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};

use citycount_core::error::{CityCountError, Result};

/// Store operation label, restricted to the two calls the worker makes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Incr,
    Ping,
}

impl StoreOp {
    pub fn as_str(self) -> &'static str {
        match self {
            StoreOp::Incr => "incr",
            StoreOp::Ping => "ping",
        }
    }
}

pub struct Metrics {
    registry: Registry,

    pub handler_duration: HistogramVec,
    pub http_in_flight: IntGauge,

    pub queue_wait: Histogram,
    pub queue_dropped: IntCounter,
    pub store_ops: IntCounterVec,

    pub weather_duration: Histogram,
    pub weather_in_flight: IntGauge,
    pub weather_status: IntCounterVec,
    pub weather_errors: IntCounter,

    draining: IntGauge,
}

impl Metrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let handler_duration = HistogramVec::new(
            HistogramOpts::new(
                "citycount_handlers_duration_seconds",
                "Handlers request duration in seconds",
            ),
            &["path"],
        )
        .map_err(registration_failed)?;
        let http_in_flight = IntGauge::new(
            "citycount_http_requests_in_flight",
            "The current number of HTTP requests being served.",
        )
        .map_err(registration_failed)?;

        let queue_wait = Histogram::with_opts(HistogramOpts::new(
            "citycount_redis_queue_wait_duration_seconds",
            "The wait duration when trying to write to the redis queue",
        ))
        .map_err(registration_failed)?;
        let queue_dropped = IntCounter::new(
            "citycount_redis_queue_dropped_total",
            "Keys dropped because the redis worker had stopped.",
        )
        .map_err(registration_failed)?;
        let store_ops = IntCounterVec::new(
            Opts::new(
                "citycount_redis_worker_operations_total",
                "The total operations performed by redis worker.",
            ),
            &["operation", "result"],
        )
        .map_err(registration_failed)?;

        let weather_duration = Histogram::with_opts(HistogramOpts::new(
            "citycount_weather_request_duration_seconds",
            "The duration of the requests to the weather service.",
        ))
        .map_err(registration_failed)?;
        let weather_in_flight = IntGauge::new(
            "citycount_weather_requests_current",
            "The current number of requests to the weather service.",
        )
        .map_err(registration_failed)?;
        let weather_status = IntCounterVec::new(
            Opts::new(
                "citycount_weather_requests_total",
                "The total number of requests to the weather service by status.",
            ),
            &["status"],
        )
        .map_err(registration_failed)?;
        let weather_errors = IntCounter::new(
            "citycount_weather_errors_total",
            "The total number of weather client errors",
        )
        .map_err(registration_failed)?;

        let draining = IntGauge::new("citycount_draining", "1 once shutdown has begun.")
            .map_err(registration_failed)?;

        let m = Self {
            registry,
            handler_duration,
            http_in_flight,
            queue_wait,
            queue_dropped,
            store_ops,
            weather_duration,
            weather_in_flight,
            weather_status,
            weather_errors,
            draining,
        };

        m.register(Box::new(m.handler_duration.clone()))?;
        m.register(Box::new(m.http_in_flight.clone()))?;
        m.register(Box::new(m.queue_wait.clone()))?;
        m.register(Box::new(m.queue_dropped.clone()))?;
        m.register(Box::new(m.store_ops.clone()))?;
        m.register(Box::new(m.weather_duration.clone()))?;
        m.register(Box::new(m.weather_in_flight.clone()))?;
        m.register(Box::new(m.weather_status.clone()))?;
        m.register(Box::new(m.weather_errors.clone()))?;
        m.register(Box::new(m.draining.clone()))?;

        Ok(m)
    }

    /// Register an additional collector. Fails if any of its names is taken.
    pub fn register(&self, c: Box<dyn Collector>) -> Result<()> {
        self.registry.register(c).map_err(registration_failed)
    }

    pub fn record_store_op(&self, op: StoreOp, ok: bool) {
        let result = if ok { "ok" } else { "error" };
        self.store_ops.with_label_values(&[op.as_str(), result]).inc();
    }

    /// Current value of one `(operation, result)` series.
    pub fn store_op_count(&self, op: StoreOp, ok: bool) -> u64 {
        let result = if ok { "ok" } else { "error" };
        self.store_ops.with_label_values(&[op.as_str(), result]).get()
    }

    /// Mark draining state.
    pub fn set_draining(&self) {
        self.draining.set(1);
    }

    /// Return whether draining is active.
    pub fn is_draining(&self) -> bool {
        self.draining.get() != 0
    }

    /// Gather every collector and render the Prometheus text exposition.
    pub fn render(&self) -> Result<String> {
        let families = self.registry.gather();
        let mut buf = Vec::new();
        TextEncoder::new()
            .encode(&families, &mut buf)
            .map_err(|e| CityCountError::Internal(format!("metrics encode failed: {e}")))?;
        String::from_utf8(buf)
            .map_err(|e| CityCountError::Internal(format!("metrics output not utf-8: {e}")))
    }
}

fn registration_failed(e: prometheus::Error) -> CityCountError {
    CityCountError::Internal(format!("metric registration failed: {e}"))
}
