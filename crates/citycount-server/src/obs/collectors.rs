//! Pull collectors evaluated at scrape time.
//!
//! Neither collector caches anything: a scrape costs exactly one read of the
//! underlying value. The reads are non-blocking and never mutate what they
//! observe.

use std::sync::Arc;

use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{IntCounter, IntGauge};

use citycount_core::error::{CityCountError, Result};
use citycount_core::store::{CounterStore, PoolStats};

#[derive(Clone, Copy)]
enum Kind {
    Counter,
    Gauge,
}

struct PoolField {
    name: &'static str,
    help: &'static str,
    kind: Kind,
    read: fn(&PoolStats) -> u64,
}

const POOL_FIELDS: [PoolField; 6] = [
    PoolField {
        name: "citycount_redis_connections_requests_total",
        help: "The total number of connections requests to redis pool.",
        kind: Kind::Counter,
        read: |s| s.requests,
    },
    PoolField {
        name: "citycount_redis_connections_hits_total",
        help: "The total number of times a free connection was found in redis pool.",
        kind: Kind::Counter,
        read: |s| s.hits,
    },
    PoolField {
        name: "citycount_redis_connections_waits_total",
        help: "The total number of times the redis pool had to wait for a connection.",
        kind: Kind::Counter,
        read: |s| s.waits,
    },
    PoolField {
        name: "citycount_redis_connections_timeouts_total",
        help: "The total number of wait timeouts in redis pool.",
        kind: Kind::Counter,
        read: |s| s.timeouts,
    },
    PoolField {
        name: "citycount_redis_connections_current",
        help: "The current number of connections in redis pool.",
        kind: Kind::Gauge,
        read: |s| u64::from(s.total_conns),
    },
    PoolField {
        name: "citycount_redis_connections_free_current",
        help: "The current number of free connections in redis pool.",
        kind: Kind::Gauge,
        read: |s| u64::from(s.idle_conns),
    },
];

/// One-shot sample: a fresh metric holding `value`, collected immediately.
fn sample(name: &str, help: &str, kind: Kind, value: u64) -> prometheus::Result<Vec<MetricFamily>> {
    Ok(match kind {
        Kind::Counter => {
            let c = IntCounter::new(name, help)?;
            c.inc_by(value);
            c.collect()
        }
        Kind::Gauge => {
            let g = IntGauge::new(name, help)?;
            g.set(i64::try_from(value).unwrap_or(i64::MAX));
            g.collect()
        }
    })
}

fn descs_of(name: &str, help: &str, kind: Kind) -> Result<Vec<Desc>> {
    let invalid = |e: prometheus::Error| CityCountError::Internal(format!("invalid metric {name}: {e}"));
    let metric: Box<dyn Collector> = match kind {
        Kind::Counter => Box::new(IntCounter::new(name, help).map_err(invalid)?),
        Kind::Gauge => Box::new(IntGauge::new(name, help).map_err(invalid)?),
    };
    let descs = metric.desc().into_iter().cloned().collect();
    Ok(descs)
}

/// Translates the store's `PoolStats` into six samples per scrape.
pub struct PoolStatsCollector {
    store: Arc<dyn CounterStore>,
    descs: Vec<Desc>,
}

impl PoolStatsCollector {
    pub fn new(store: Arc<dyn CounterStore>) -> Result<Self> {
        let mut descs = Vec::with_capacity(POOL_FIELDS.len());
        for f in &POOL_FIELDS {
            descs.extend(descs_of(f.name, f.help, f.kind)?);
        }
        Ok(Self { store, descs })
    }
}

impl Collector for PoolStatsCollector {
    fn desc(&self) -> Vec<&Desc> {
        self.descs.iter().collect()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let stats = self.store.pool_stats();
        let mut out = Vec::with_capacity(POOL_FIELDS.len());
        for f in &POOL_FIELDS {
            match sample(f.name, f.help, f.kind, (f.read)(&stats)) {
                Ok(families) => out.extend(families),
                Err(e) => tracing::warn!(metric = f.name, error = %e, "pool stats sample failed"),
            }
        }
        out
    }
}

/// Gauge whose value is produced by a callback on every scrape.
pub struct FnGauge {
    name: &'static str,
    help: &'static str,
    read: Box<dyn Fn() -> usize + Send + Sync>,
    descs: Vec<Desc>,
}

impl FnGauge {
    pub fn new(
        name: &'static str,
        help: &'static str,
        read: impl Fn() -> usize + Send + Sync + 'static,
    ) -> Result<Self> {
        Ok(Self {
            name,
            help,
            read: Box::new(read),
            descs: descs_of(name, help, Kind::Gauge)?,
        })
    }
}

impl Collector for FnGauge {
    fn desc(&self) -> Vec<&Desc> {
        self.descs.iter().collect()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let value = (self.read)() as u64;
        match sample(self.name, self.help, Kind::Gauge, value) {
            Ok(families) => families,
            Err(e) => {
                tracing::warn!(metric = self.name, error = %e, "gauge sample failed");
                Vec::new()
            }
        }
    }
}
