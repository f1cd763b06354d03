//! Shared application state for the citycount server.
//!
//! Built once at startup and cloned into every handler. Startup order
//! matters: the metrics registry exists before the store or the pipeline do
//! any work, and both pull collectors are registered before the first scrape.

use std::sync::Arc;

use citycount_core::error::Result;
use citycount_core::store::CounterStore;

use crate::config::ServiceConfig;
use crate::obs::{FnGauge, Metrics, PoolStatsCollector};
use crate::pipeline::{PipelineHandle, WritePipeline};
use crate::weather::WeatherClient;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: ServiceConfig,
    metrics: Arc<Metrics>,
    pipeline: WritePipeline,
    weather: WeatherClient,
}

impl AppState {
    /// Wire metrics, pipeline and weather client around an already connected
    /// store, and start the pipeline worker.
    pub fn new(
        cfg: ServiceConfig,
        store: Arc<dyn CounterStore>,
        metrics: Arc<Metrics>,
    ) -> Result<(Self, PipelineHandle)> {
        metrics.register(Box::new(PoolStatsCollector::new(Arc::clone(&store))?))?;

        let (pipeline, worker) = WritePipeline::start(
            cfg.pipeline.queue_capacity,
            cfg.pipeline.idle_check_interval(),
            store,
            Arc::clone(&metrics),
        );

        metrics.register(Box::new(FnGauge::new(
            "citycount_redis_queue_current_length",
            "The current number of items on redis queue.",
            pipeline.len_reader(),
        )?))?;

        let weather = WeatherClient::new(&cfg.weather, Arc::clone(&metrics))?;

        let state = Self {
            inner: Arc::new(AppStateInner {
                cfg,
                metrics,
                pipeline,
                weather,
            }),
        };
        Ok((state, worker))
    }

    pub fn cfg(&self) -> &ServiceConfig {
        &self.inner.cfg
    }

    pub fn metrics(&self) -> &Metrics {
        &self.inner.metrics
    }

    pub fn pipeline(&self) -> &WritePipeline {
        &self.inner.pipeline
    }

    pub fn weather(&self) -> &WeatherClient {
        &self.inner.weather
    }

    pub fn set_draining(&self) {
        self.inner.metrics.set_draining();
    }

    pub fn is_draining(&self) -> bool {
        self.inner.metrics.is_draining()
    }
}
