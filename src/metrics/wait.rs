//! Wait-time statistics
//!
//! Each actor keeps its own histogram (no sharing on the hot path); the driver
//! merges them after the join.

use std::time::Duration;

use hdrhistogram::Histogram;
use tracing::warn;

/// Upper bound of a recorded wait: one hour in microseconds
const MAX_WAIT_US: u64 = 3_600_000_000;

/// Per-actor histogram of lock waits, in microseconds
pub struct WaitStats {
    histogram: Histogram<u64>,
}

impl WaitStats {
    pub fn new() -> Self {
        Self {
            histogram: Histogram::new_with_bounds(1, MAX_WAIT_US, 3)
                .expect("static histogram bounds are valid"),
        }
    }

    /// Record one wait
    #[inline]
    pub fn record(&mut self, waited: Duration) {
        let micros = u64::try_from(waited.as_micros()).unwrap_or(MAX_WAIT_US);
        self.histogram.saturating_record(micros);
    }

    /// Fold another actor's waits into this one
    pub fn merge(&mut self, other: &WaitStats) {
        if let Err(e) = self.histogram.add(&other.histogram) {
            warn!("Dropped {} wait samples on merge: {:?}", other.count(), e);
        }
    }

    pub fn count(&self) -> u64 {
        self.histogram.len()
    }

    pub fn summary(&self) -> WaitSummary {
        if self.histogram.is_empty() {
            return WaitSummary::default();
        }
        WaitSummary {
            samples: self.histogram.len(),
            mean_us: self.histogram.mean(),
            p50_us: self.histogram.value_at_quantile(0.50),
            p99_us: self.histogram.value_at_quantile(0.99),
            max_us: self.histogram.max(),
        }
    }
}

impl Default for WaitStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Condensed view of merged waits
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WaitSummary {
    pub samples: u64,
    pub mean_us: f64,
    pub p50_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

impl WaitSummary {
    /// Format as compact string for logs
    pub fn format(&self) -> String {
        format!(
            "waits={} avg={:.1}us p50={}us p99={}us max={}us",
            self.samples, self.mean_us, self.p50_us, self.p99_us, self.max_us
        )
    }
}
