#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Semaphore;

use citycount_core::error::{CityCountError, Result};
use citycount_core::store::{CounterStore, PoolStats};

/// In-memory `CounterStore` that records calls.
///
/// A gated store parks every increment until `open_gate` hands out permits,
/// which lets tests hold the worker inside a store call.
#[derive(Default)]
pub struct FakeStore {
    attempts: Mutex<Vec<String>>,
    incremented: Mutex<Vec<String>>,
    pings: AtomicUsize,
    fail_keys: Mutex<HashSet<String>>,
    gate: Option<Semaphore>,
    stats: Mutex<PoolStats>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gated() -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::default()
        }
    }

    pub fn open_gate(&self, n: usize) {
        if let Some(g) = &self.gate {
            g.add_permits(n);
        }
    }

    pub fn fail_on(&self, key: &str) {
        self.fail_keys.lock().insert(key.to_string());
    }

    pub fn set_stats(&self, stats: PoolStats) {
        *self.stats.lock() = stats;
    }

    /// Keys successfully incremented, in call order.
    pub fn keys(&self) -> Vec<String> {
        self.incremented.lock().clone()
    }

    /// Every key the worker tried, including failures.
    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().clone()
    }

    pub fn pings(&self) -> usize {
        self.pings.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CounterStore for FakeStore {
    async fn increment(&self, key: &str) -> Result<()> {
        if let Some(g) = &self.gate {
            let permit = g
                .acquire()
                .await
                .map_err(|_| CityCountError::Internal("gate closed".into()))?;
            permit.forget();
        }
        self.attempts.lock().push(key.to_string());
        if self.fail_keys.lock().contains(key) {
            return Err(CityCountError::Store("connection reset by peer".into()));
        }
        self.incremented.lock().push(key.to_string());
        Ok(())
    }

    async fn health_check(&self) -> Result<()> {
        self.pings.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn pool_stats(&self) -> PoolStats {
        *self.stats.lock()
    }
}

/// Poll `cond` every few milliseconds for up to two seconds.
pub async fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    for _ in 0..400 {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    cond()
}
