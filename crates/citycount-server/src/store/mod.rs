//! Backing Store Client.
//!
//! `RedisStore` is the production `CounterStore`: a deadpool-managed pool of async
//! Redis connections with client-local accounting that the metrics scrape
//! reads through `pool_stats()`.

mod pool;
pub mod redis;

pub use self::redis::RedisStore;
pub use citycount_core::store::{CounterStore, PoolStats};
