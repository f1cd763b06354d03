use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use citycount_core::store::CounterStore;

use crate::obs::{Metrics, StoreOp};

/// Single consumer of the write queue.
pub struct Worker {
    rx: mpsc::Receiver<String>,
    idle_interval: Duration,
    store: Arc<dyn CounterStore>,
    metrics: Arc<Metrics>,
}

/// Owns the running worker task. Dropping it also stops the worker.
pub struct PipelineHandle {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl PipelineHandle {
    /// Ask the worker to stop and wait for it. A store call already in
    /// flight completes first; keys still queued are not delivered.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.handle.await {
            tracing::error!(error = %e, "redis worker task failed");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Worker {
    pub(super) fn new(
        rx: mpsc::Receiver<String>,
        idle_interval: Duration,
        store: Arc<dyn CounterStore>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            rx,
            idle_interval,
            store,
            metrics,
        }
    }

    pub fn spawn(self) -> PipelineHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(self.run(shutdown_rx));
        PipelineHandle {
            shutdown_tx,
            handle,
        }
    }

    /// Drain keys until shutdown. With no key for `idle_interval`, ping the
    /// store once and start a fresh idle window.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(idle_interval = ?self.idle_interval, "starting redis worker");

        loop {
            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }

                maybe_key = self.rx.recv() => {
                    let Some(key) = maybe_key else { break; };
                    self.increment(&key).await;
                }

                _ = tokio::time::sleep(self.idle_interval) => {
                    self.ping().await;
                }
            }
        }

        self.rx.close();
        let mut abandoned = 0usize;
        while self.rx.try_recv().is_ok() {
            abandoned += 1;
        }
        tracing::info!(abandoned, "redis worker stopped");
    }

    async fn increment(&self, key: &str) {
        tracing::debug!(%key, "incrementing count");
        let res = self.store.increment(key).await;
        if let Err(e) = &res {
            tracing::warn!(%key, error = %e, "failed to increment key");
        }
        self.metrics.record_store_op(StoreOp::Incr, res.is_ok());
    }

    async fn ping(&self) {
        tracing::debug!("pinging redis");
        let res = self.store.health_check().await;
        if let Err(e) = &res {
            tracing::warn!(error = %e, "redis health check failed");
        }
        self.metrics.record_store_op(StoreOp::Ping, res.is_ok());
    }
}
