//! In-process metrics.
//!
//! Events that would otherwise be lost (durations, per-call outcomes) are
//! accumulated where they happen. Values that are cheap to read live (pool
//! stats, queue length) are computed by pull collectors on each scrape.

pub mod collectors;
pub mod guard;
pub mod metrics;

pub use collectors::{FnGauge, PoolStatsCollector};
pub use guard::InFlight;
pub use metrics::{Metrics, StoreOp};
