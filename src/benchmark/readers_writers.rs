//! Readers-writers engine
//!
//! M workers run a seeded random mix of reads and writes against one map
//! behind one `RwLock`. The lock is deliberately coarse: writers serialize
//! against everyone, readers only share with readers, and that contention is
//! what the benchmark measures.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use super::control::RunControl;
use super::counters::RunCounters;
use super::pool::ActorPool;
use crate::metrics::ResourceSample;
use crate::sync::StartGate;
use crate::utils::{BenchError, Result};

/// Worker `i` seeds its generator with `WORKER_SEED_BASE + i`
pub const WORKER_SEED_BASE: u64 = 1234;

/// Operations requested per unit of size
pub const OPERATIONS_PER_SIZE: u64 = 1000;

/// Keys are drawn from [0, KEY_SPACE_FACTOR * size]
pub const KEY_SPACE_FACTOR: u64 = 10;

/// Workers publish progress in strides to keep the shared counter cold
const PROGRESS_STRIDE: u64 = 1024;

/// Readers-writers parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadersWritersParams {
    /// Instance size: operations = size * 1000, keys in [0, 10 * size]
    pub size: u64,
    /// Worker count, at least 1
    pub workers: usize,
    /// Percentage of operations that are reads, 0..=100
    pub read_pct: u32,
}

impl ReadersWritersParams {
    pub fn validate(&self) -> Result<()> {
        if self.size == 0 {
            return Err(BenchError::Config("readers-writers size must be at least 1".to_string()));
        }
        if self.workers == 0 {
            return Err(BenchError::Config("readers-writers needs at least 1 worker".to_string()));
        }
        if self.read_pct > 100 {
            return Err(BenchError::Config(format!(
                "read percentage must be within 0..=100, got {}",
                self.read_pct
            )));
        }
        self.size
            .checked_mul(OPERATIONS_PER_SIZE)
            .and_then(|_| self.size.checked_mul(KEY_SPACE_FACTOR))
            .ok_or_else(|| BenchError::Config(format!("readers-writers size {} is too large", self.size)))?;
        Ok(())
    }

    /// Total operations requested
    pub fn total_operations(&self) -> u64 {
        self.size * OPERATIONS_PER_SIZE
    }

    /// Largest key (inclusive)
    pub fn max_key(&self) -> u64 {
        self.size * KEY_SPACE_FACTOR
    }
}

/// Split `total` into `workers` shares; the first `total % workers` get one extra
pub fn split_operations(total: u64, workers: usize) -> Vec<u64> {
    if workers == 0 {
        return Vec::new();
    }
    let workers_u64 = workers as u64;
    let base = total / workers_u64;
    let remainder = total % workers_u64;
    (0..workers_u64)
        .map(|index| base + u64::from(index < remainder))
        .collect()
}

/// Keyed store guarded by a single read-write lock
#[derive(Debug, Default)]
pub struct SharedStore {
    entries: RwLock<HashMap<u64, u64>>,
}

impl SharedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look a key up under the shared lock
    #[inline]
    pub fn read(&self, key: u64) -> Option<u64> {
        self.entries.read().get(&key).copied()
    }

    /// Store a value under the exclusive lock
    #[inline]
    pub fn write(&self, key: u64, value: u64) {
        self.entries.write().insert(key, value);
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

/// Per-worker tally of lock-mode entries
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WorkerTally {
    pub reads: u64,
    pub writes: u64,
}

impl WorkerTally {
    pub fn operations(&self) -> u64 {
        self.reads + self.writes
    }
}

struct Worker {
    quota: u64,
    max_key: u64,
    read_pct: u32,
    rng: fastrand::Rng,
}

impl Worker {
    fn new(index: usize, quota: u64, params: &ReadersWritersParams) -> Self {
        Self {
            quota,
            max_key: params.max_key(),
            read_pct: params.read_pct,
            rng: fastrand::Rng::with_seed(WORKER_SEED_BASE + index as u64),
        }
    }

    fn run(mut self, store: &SharedStore, counters: &RunCounters, gate: &StartGate) -> WorkerTally {
        gate.wait();

        let mut tally = WorkerTally::default();
        let mut done = 0u64;
        while done < self.quota {
            if counters.is_cancelled() {
                break;
            }

            let key = self.rng.u64(0..=self.max_key);
            if self.rng.u32(0..100) < self.read_pct {
                std::hint::black_box(store.read(key));
                tally.reads += 1;
            } else {
                let value = self.rng.u64(..);
                store.write(key, value);
                tally.writes += 1;
            }

            done += 1;
            if done % PROGRESS_STRIDE == 0 {
                counters.record_progress(PROGRESS_STRIDE);
            }
        }

        counters.record_progress(done % PROGRESS_STRIDE);
        counters.add_operations(done);
        tally
    }
}

/// Result of a readers-writers run
#[derive(Debug)]
pub struct ReadersWritersOutcome {
    /// Operations executed across all workers
    pub operations: u64,
    /// Shared-lock entries
    pub reads: u64,
    /// Exclusive-lock entries
    pub writes: u64,
    /// Distinct keys in the store at the end
    pub store_len: usize,
    /// Baseline taken when the gate opened
    pub sample: ResourceSample,
}

/// Run the workload to completion
pub fn run(params: ReadersWritersParams, control: &RunControl) -> Result<ReadersWritersOutcome> {
    params.validate()?;

    let total = params.total_operations();
    let shares = split_operations(total, params.workers);
    debug!(
        "readers-writers: {} operations over {} workers, {}% reads, keys 0..={}",
        total,
        params.workers,
        params.read_pct,
        params.max_key()
    );

    let store = Arc::new(SharedStore::new());
    let mut pool = ActorPool::new("rw-worker");

    for (index, quota) in shares.into_iter().enumerate() {
        // More workers than operations: the extra ones have nothing to do
        if quota == 0 {
            continue;
        }
        let worker = Worker::new(index, quota, &params);
        let store = Arc::clone(&store);
        let counters = Arc::clone(control.counters());
        let gate = Arc::clone(control.gate());

        let spawned = pool.spawn(move |_| worker.run(&store, &counters, &gate));
        if let Err(e) = spawned {
            control.abort();
            return Err(e);
        }
    }

    let sample = control.release();
    let tallies = pool.join(control.deadline(), control.counters())?;

    let (reads, writes) = tallies
        .iter()
        .fold((0u64, 0u64), |(r, w), t| (r + t.reads, w + t.writes));
    let operations = control.counters().operations();

    if control.counters().is_cancelled() || operations != total {
        return Err(BenchError::Interrupted {
            problem: "rw",
            completed: operations,
            requested: total,
        });
    }
    debug_assert_eq!(reads + writes, operations);

    let store_len = store.len();
    info!("Store holds {} keys after {} reads / {} writes", store_len, reads, writes);

    Ok(ReadersWritersOutcome {
        operations,
        reads,
        writes,
        store_len,
        sample,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::benchmark::control::cancel_at_progress;
    use std::time::Duration;

    fn run_mix(size: u64, workers: usize, read_pct: u32) -> ReadersWritersOutcome {
        let control = RunControl::new(Duration::from_secs(60));
        run(
            ReadersWritersParams {
                size,
                workers,
                read_pct,
            },
            &control,
        )
        .unwrap()
    }

    #[test]
    fn test_split_operations_even() {
        assert_eq!(split_operations(1000, 4), vec![250, 250, 250, 250]);
    }

    #[test]
    fn test_split_operations_remainder_to_first() {
        let shares = split_operations(1000, 3);
        assert_eq!(shares, vec![334, 333, 333]);
        assert_eq!(shares.iter().sum::<u64>(), 1000);
    }

    #[test]
    fn test_split_operations_more_workers_than_ops() {
        let shares = split_operations(2, 5);
        assert_eq!(shares, vec![1, 1, 0, 0, 0]);
    }

    #[test]
    fn test_split_operations_no_workers() {
        assert!(split_operations(10, 0).is_empty());
    }

    #[test]
    fn test_store_read_write() {
        let store = SharedStore::new();
        assert!(store.is_empty());
        assert_eq!(store.read(3), None);
        store.write(3, 42);
        store.write(3, 43);
        assert_eq!(store.read(3), Some(43));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_all_writes_single_worker() {
        let outcome = run_mix(1, 1, 0);
        assert_eq!(outcome.operations, 1000);
        assert_eq!(outcome.writes, 1000);
        assert_eq!(outcome.reads, 0);
        // keys come from 0..=10
        assert!(outcome.store_len >= 1 && outcome.store_len <= 11);
    }

    #[test]
    fn test_all_reads() {
        let outcome = run_mix(2, 3, 100);
        assert_eq!(outcome.operations, 2000);
        assert_eq!(outcome.reads, 2000);
        assert_eq!(outcome.writes, 0);
        assert_eq!(outcome.store_len, 0);
    }

    #[test]
    fn test_exact_total_for_uneven_workers() {
        for workers in [1, 3, 7, 13] {
            let outcome = run_mix(1, workers, 80);
            assert_eq!(outcome.operations, 1000, "workers={}", workers);
            assert_eq!(outcome.reads + outcome.writes, 1000);
        }
    }

    #[test]
    fn test_mix_is_deterministic_per_worker_seed() {
        let first = run_mix(3, 4, 50);
        let second = run_mix(3, 4, 50);
        assert_eq!(first.reads, second.reads);
        assert_eq!(first.writes, second.writes);
        assert!(first.reads > 0 && first.writes > 0);
    }

    #[test]
    fn test_cancel_mid_run_reports_interruption() {
        let control = RunControl::new(Duration::from_secs(60));
        let canceller = cancel_at_progress(&control, PROGRESS_STRIDE);

        let err = run(
            ReadersWritersParams {
                size: 50_000,
                workers: 4,
                read_pct: 50,
            },
            &control,
        )
        .unwrap_err();
        canceller.join().unwrap();

        match err {
            BenchError::Interrupted {
                problem,
                completed,
                requested,
            } => {
                assert_eq!(problem, "rw");
                assert_eq!(requested, 50_000_000);
                assert!(completed >= PROGRESS_STRIDE && completed < requested);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_invalid_params_rejected() {
        let control = RunControl::default();
        for params in [
            ReadersWritersParams {
                size: 0,
                workers: 1,
                read_pct: 50,
            },
            ReadersWritersParams {
                size: 1,
                workers: 0,
                read_pct: 50,
            },
            ReadersWritersParams {
                size: 1,
                workers: 1,
                read_pct: 101,
            },
            ReadersWritersParams {
                size: u64::MAX,
                workers: 1,
                read_pct: 50,
            },
        ] {
            let err = run(params, &control).unwrap_err();
            assert!(matches!(err, BenchError::Config(_)), "{:?}", params);
        }
    }
}
