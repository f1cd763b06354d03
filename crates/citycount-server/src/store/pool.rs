use std::fmt::Display;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use deadpool::managed::{self, Manager, Object, Pool, PoolError, RecycleResult, TimeoutType, Timeouts};
use deadpool::Runtime;
use redis::aio::MultiplexedConnection;
use redis::RedisError;

use citycount_core::error::{CityCountError, Result};
use citycount_core::store::PoolStats;

/// Opens multiplexed connections for the pool.
pub(crate) struct RedisManager {
    client: redis::Client,
}

impl RedisManager {
    pub(crate) fn new(client: redis::Client) -> Self {
        Self { client }
    }
}

impl Manager for RedisManager {
    type Type = MultiplexedConnection;
    type Error = RedisError;

    async fn create(&self) -> std::result::Result<MultiplexedConnection, RedisError> {
        self.client.get_multiplexed_async_connection().await
    }

    async fn recycle(
        &self,
        _conn: &mut MultiplexedConnection,
        _: &managed::Metrics,
    ) -> RecycleResult<RedisError> {
        // Broken connections are taken out of the pool by the caller.
        Ok(())
    }
}

/// deadpool pool plus the checkout counters deadpool does not keep.
///
/// `total_conns` and `idle_conns` come from `Pool::status`; the four
/// counters are maintained around `get`.
pub(crate) struct ConnPool<M: Manager> {
    pool: Pool<M>,
    wait_timeout: Duration,
    create_timeout: Duration,

    requests: AtomicU64,
    hits: AtomicU64,
    waits: AtomicU64,
    timeouts: AtomicU64,
}

impl<M> ConnPool<M>
where
    M: Manager,
    M::Error: Display,
{
    pub(crate) fn new(
        manager: M,
        size: usize,
        wait_timeout: Duration,
        create_timeout: Duration,
    ) -> Result<Self> {
        let pool = Pool::builder(manager)
            .max_size(size)
            .wait_timeout(Some(wait_timeout))
            .create_timeout(Some(create_timeout))
            .runtime(Runtime::Tokio1)
            .build()
            .map_err(|e| CityCountError::Config(format!("store pool build failed: {e}")))?;

        Ok(Self {
            pool,
            wait_timeout,
            create_timeout,
            requests: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            waits: AtomicU64::new(0),
            timeouts: AtomicU64::new(0),
        })
    }

    /// Check out a connection. A free slot is taken without waiting; only
    /// when every slot is busy does the call wait, up to `wait_timeout`.
    pub(crate) async fn get(&self) -> Result<Object<M>> {
        self.requests.fetch_add(1, Ordering::Relaxed);

        let no_wait = Timeouts {
            wait: Some(Duration::ZERO),
            create: Some(self.create_timeout),
            recycle: None,
        };
        let obj = match self.pool.timeout_get(&no_wait).await {
            Ok(obj) => obj,
            Err(PoolError::Timeout(TimeoutType::Wait)) => {
                self.waits.fetch_add(1, Ordering::Relaxed);
                match self.pool.get().await {
                    Ok(obj) => obj,
                    Err(PoolError::Timeout(TimeoutType::Wait)) => {
                        self.timeouts.fetch_add(1, Ordering::Relaxed);
                        return Err(CityCountError::PoolTimeout(
                            self.wait_timeout.as_millis() as u64,
                        ));
                    }
                    Err(e) => return Err(self.checkout_failed(e)),
                }
            }
            Err(e) => return Err(self.checkout_failed(e)),
        };

        if Object::metrics(&obj).recycle_count > 0 {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
        Ok(obj)
    }

    pub(crate) fn stats(&self) -> PoolStats {
        let status = self.pool.status();
        PoolStats {
            requests: self.requests.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            waits: self.waits.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            total_conns: status.size as u32,
            idle_conns: status.available as u32,
        }
    }

    fn checkout_failed(&self, e: PoolError<M::Error>) -> CityCountError {
        match e {
            PoolError::Timeout(_) => {
                CityCountError::StoreTimeout(self.create_timeout.as_millis() as u64)
            }
            PoolError::Backend(e) => CityCountError::Store(format!("connect failed: {e}")),
            other => CityCountError::Internal(format!("pool checkout failed: {other}")),
        }
    }
}

/// Close a checked-out connection instead of returning it to the pool.
pub(crate) fn discard<M: Manager>(obj: Object<M>) {
    drop(Object::take(obj));
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::atomic::{AtomicBool, AtomicU32};

    use super::*;

    /// Hands out numbered fake connections.
    #[derive(Default)]
    struct Numbered {
        next: AtomicU32,
        refuse: AtomicBool,
    }

    impl Manager for Numbered {
        type Type = u32;
        type Error = io::Error;

        async fn create(&self) -> std::result::Result<u32, io::Error> {
            if self.refuse.load(Ordering::SeqCst) {
                return Err(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"));
            }
            Ok(self.next.fetch_add(1, Ordering::SeqCst))
        }

        async fn recycle(&self, _: &mut u32, _: &managed::Metrics) -> RecycleResult<io::Error> {
            Ok(())
        }
    }

    fn pool(size: usize, wait_ms: u64) -> ConnPool<Numbered> {
        pool_with(Numbered::default(), size, wait_ms)
    }

    fn pool_with(manager: Numbered, size: usize, wait_ms: u64) -> ConnPool<Numbered> {
        ConnPool::new(
            manager,
            size,
            Duration::from_millis(wait_ms),
            Duration::from_millis(500),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn reused_connection_counts_as_hit() {
        let p = pool(2, 100);

        let first = p.get().await.unwrap();
        let s = p.stats();
        assert_eq!((s.requests, s.hits, s.total_conns, s.idle_conns), (1, 0, 1, 0));

        drop(first);
        assert_eq!(p.stats().idle_conns, 1);

        let again = p.get().await.unwrap();
        assert_eq!(*again, 0);
        let s = p.stats();
        assert_eq!((s.requests, s.hits, s.waits, s.total_conns), (2, 1, 0, 1));
    }

    #[tokio::test]
    async fn held_checkout_makes_the_next_one_wait_and_time_out() {
        let p = pool(1, 50);
        let held = p.get().await.unwrap();

        let err = p.get().await.err().unwrap();
        assert!(matches!(err, CityCountError::PoolTimeout(50)));

        let s = p.stats();
        assert_eq!((s.requests, s.waits, s.timeouts), (2, 1, 1));
        assert_eq!((s.total_conns, s.idle_conns), (1, 0));

        drop(held);
        p.get().await.unwrap();
        let s = p.stats();
        assert_eq!((s.requests, s.waits, s.timeouts, s.hits), (3, 1, 1, 1));
    }

    #[tokio::test]
    async fn waiter_gets_the_released_connection() {
        let p = pool(1, 1000);
        let held = p.get().await.unwrap();

        let (got, ()) = tokio::join!(p.get(), async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            drop(held);
        });

        assert_eq!(*got.unwrap(), 0);
        let s = p.stats();
        assert_eq!((s.waits, s.timeouts, s.hits), (1, 0, 1));
    }

    #[tokio::test]
    async fn discarded_connection_is_not_reused() {
        let p = pool(1, 100);

        let conn = p.get().await.unwrap();
        discard(conn);
        let s = p.stats();
        assert_eq!((s.total_conns, s.idle_conns), (0, 0));

        let fresh = p.get().await.unwrap();
        assert_eq!(*fresh, 1);
        assert_eq!(p.stats().hits, 0);
    }

    #[tokio::test]
    async fn create_failure_is_a_store_error() {
        let refusing = Numbered {
            refuse: AtomicBool::new(true),
            ..Numbered::default()
        };
        let p = pool_with(refusing, 1, 100);

        let err = p.get().await.err().unwrap();
        assert!(matches!(err, CityCountError::Store(ref m) if m.contains("refused")));
        assert_eq!(p.stats().total_conns, 0);
    }
}
