//! Backing-store contract used by the write pipeline and the metrics scrape.

use async_trait::async_trait;

use crate::error::Result;

/// Snapshot of a store client's connection pool.
///
/// Read from client-local counters; taking one never touches the network.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Connection checkouts issued.
    pub requests: u64,
    /// Checkouts served by an idle pooled connection.
    pub hits: u64,
    /// Checkouts that had to wait for a free slot.
    pub waits: u64,
    /// Waits that gave up.
    pub timeouts: u64,
    /// Connections currently open.
    pub total_conns: u32,
    /// Open connections parked in the pool.
    pub idle_conns: u32,
}

/// A key-increment store.
///
/// Implementations synchronize internally; callers share one instance behind
/// an `Arc` and may call `pool_stats` concurrently with in-flight operations.
#[async_trait]
pub trait CounterStore: Send + Sync + 'static {
    /// Increment the counter named `key` by one. Not idempotent.
    async fn increment(&self, key: &str) -> Result<()>;

    /// Minimal round-trip to confirm connectivity. No effect on stored data.
    async fn health_check(&self) -> Result<()>;

    /// Current pool counters.
    fn pool_stats(&self) -> PoolStats;
}
