use std::time::Duration;

use async_trait::async_trait;
use redis::{Cmd, FromRedisValue, RedisResult};
use tokio::time::timeout;

use citycount_core::error::{CityCountError, Result};
use citycount_core::store::{CounterStore, PoolStats};

use super::pool::{discard, ConnPool, RedisManager};
use crate::config::StoreSection;

/// Redis-backed counter store.
pub struct RedisStore {
    pool: ConnPool<RedisManager>,
    op_timeout: Duration,
}

impl RedisStore {
    /// Build the pool and ping the server once. An unreachable server is a startup
    /// failure; the caller must not run without a store.
    pub async fn connect(cfg: &StoreSection) -> Result<Self> {
        let client = redis::Client::open(cfg.addr.as_str())
            .map_err(|e| CityCountError::Config(format!("store.addr is invalid: {e}")))?;

        let store = Self {
            pool: ConnPool::new(
                RedisManager::new(client),
                cfg.pool_size,
                cfg.pool_timeout(),
                cfg.op_timeout(),
            )?,
            op_timeout: cfg.op_timeout(),
        };

        store.health_check().await.map_err(|e| {
            CityCountError::Store(format!("failed to initialize redis client: {e}"))
        })?;

        tracing::info!(pool_size = cfg.pool_size, "redis store connected");
        Ok(store)
    }

    async fn query<T>(&self, cmd: Cmd) -> Result<T>
    where
        T: FromRedisValue + Send,
    {
        let mut conn = self.pool.get().await?;

        let outcome: std::result::Result<RedisResult<T>, _> =
            timeout(self.op_timeout, cmd.query_async(&mut *conn)).await;
        match outcome {
            Ok(Ok(v)) => Ok(v),
            Ok(Err(e)) => {
                if e.is_io_error() || e.is_connection_dropped() {
                    discard(conn);
                }
                Err(CityCountError::Store(e.to_string()))
            }
            Err(_) => {
                discard(conn);
                Err(CityCountError::StoreTimeout(self.op_timeout.as_millis() as u64))
            }
        }
    }
}

#[async_trait]
impl CounterStore for RedisStore {
    async fn increment(&self, key: &str) -> Result<()> {
        let mut cmd = redis::cmd("INCR");
        cmd.arg(key);
        let _count: i64 = self.query(cmd).await?;
        Ok(())
    }

    async fn health_check(&self) -> Result<()> {
        let _pong: String = self.query(redis::cmd("PING")).await?;
        Ok(())
    }

    fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }
}
