use prometheus::{Histogram, IntGauge};
use tokio::time::Instant;

/// One in-flight operation.
///
/// Raises `gauge` on start. On drop, whether the operation finished or its
/// future was cancelled, lowers it again and records the elapsed time.
pub struct InFlight {
    gauge: IntGauge,
    duration: Histogram,
    started: Instant,
}

impl InFlight {
    pub fn start(gauge: &IntGauge, duration: Histogram) -> Self {
        gauge.inc();
        Self {
            gauge: gauge.clone(),
            duration,
            started: Instant::now(),
        }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.gauge.dec();
        self.duration.observe(self.started.elapsed().as_secs_f64());
    }
}
