//! Per-run control block handed to every engine

use std::sync::Arc;
use std::time::{Duration, Instant};

use super::counters::RunCounters;
use crate::metrics::ResourceSample;
use crate::sync::StartGate;

/// Default bound on the final join of a run
pub const DEFAULT_RUN_TIMEOUT: Duration = Duration::from_secs(600);

/// Counters, start gate and timeout of one benchmark run
#[derive(Debug, Clone)]
pub struct RunControl {
    counters: Arc<RunCounters>,
    gate: Arc<StartGate>,
    timeout: Duration,
}

impl RunControl {
    pub fn new(timeout: Duration) -> Self {
        Self {
            counters: Arc::new(RunCounters::new()),
            gate: Arc::new(StartGate::new()),
            timeout,
        }
    }

    pub fn counters(&self) -> &Arc<RunCounters> {
        &self.counters
    }

    pub fn gate(&self) -> &Arc<StartGate> {
        &self.gate
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Take the metrics baseline, then open the gate
    pub fn release(&self) -> ResourceSample {
        let sample = ResourceSample::capture();
        self.gate.open();
        sample
    }

    /// Deadline for the joins that follow a release
    pub fn deadline(&self) -> Instant {
        Instant::now() + self.timeout
    }

    /// Cancel the run and let already spawned actors out of the gate
    pub fn abort(&self) {
        self.counters.cancel();
        self.gate.open();
    }
}

impl Default for RunControl {
    fn default() -> Self {
        Self::new(DEFAULT_RUN_TIMEOUT)
    }
}

/// Cancel `control` once its progress counter reaches `units`
#[cfg(test)]
pub(crate) fn cancel_at_progress(control: &RunControl, units: u64) -> std::thread::JoinHandle<()> {
    let counters = Arc::clone(&control.counters);
    std::thread::spawn(move || {
        let give_up = Instant::now() + Duration::from_secs(30);
        while counters.progress() < units && Instant::now() < give_up {
            std::thread::sleep(Duration::from_millis(1));
        }
        counters.cancel();
    })
}
