//! Write pipeline: decouples the request path from counter-store writes.
//!
//! Producers call [`WritePipeline::enqueue`] from any task. Keys land in a
//! bounded FIFO drained by exactly one [`Worker`]. A full queue suspends the
//! producer (backpressure) instead of dropping or buffering without bound;
//! only those suspended calls are sampled on the queue-wait histogram.
//!
//! Delivery is best effort and at most once: a failed increment is counted
//! and forgotten, and keys still queued at shutdown are discarded.

mod worker;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::Instant;

use citycount_core::store::CounterStore;

use crate::obs::Metrics;

pub use worker::{PipelineHandle, Worker};

/// Producer handle. Cheap to clone; every clone feeds the same queue.
#[derive(Clone)]
pub struct WritePipeline {
    tx: mpsc::Sender<String>,
    metrics: Arc<Metrics>,
}

impl WritePipeline {
    /// Create the queue and its (not yet running) consumer.
    pub fn new(
        capacity: usize,
        idle_interval: Duration,
        store: Arc<dyn CounterStore>,
        metrics: Arc<Metrics>,
    ) -> (Self, Worker) {
        let (tx, rx) = mpsc::channel(capacity);
        let worker = Worker::new(rx, idle_interval, store, Arc::clone(&metrics));
        (Self { tx, metrics }, worker)
    }

    /// `new` followed by spawning the worker on the current runtime.
    pub fn start(
        capacity: usize,
        idle_interval: Duration,
        store: Arc<dyn CounterStore>,
        metrics: Arc<Metrics>,
    ) -> (Self, PipelineHandle) {
        let (pipeline, worker) = Self::new(capacity, idle_interval, store, metrics);
        (pipeline, worker.spawn())
    }

    /// Queue `key` for one increment. Never fails.
    pub async fn enqueue(&self, key: impl Into<String>) {
        let key = key.into();
        let key = match self.tx.try_send(key) {
            Ok(()) => return,
            Err(TrySendError::Full(key)) => key,
            Err(TrySendError::Closed(key)) => return self.drop_key(&key),
        };

        let started = Instant::now();
        match self.tx.send(key).await {
            Ok(()) => {
                self.metrics
                    .queue_wait
                    .observe(started.elapsed().as_secs_f64());
            }
            Err(mpsc::error::SendError(key)) => self.drop_key(&key),
        }
    }

    /// Keys currently waiting for the worker.
    pub fn len(&self) -> usize {
        queue_len(&self.tx)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// False once the worker has exited; later keys are only counted as dropped.
    pub fn is_accepting(&self) -> bool {
        !self.tx.is_closed()
    }

    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }

    /// Read-only queue length callback for the metrics scrape. Holds no reference to
    /// the metrics registry.
    pub fn len_reader(&self) -> impl Fn() -> usize + Send + Sync + 'static {
        let tx = self.tx.clone();
        move || queue_len(&tx)
    }

    fn drop_key(&self, key: &str) {
        self.metrics.queue_dropped.inc();
        tracing::warn!(%key, "redis worker stopped; dropping key");
    }
}

fn queue_len(tx: &mpsc::Sender<String>) -> usize {
    tx.max_capacity().saturating_sub(tx.capacity())
}
