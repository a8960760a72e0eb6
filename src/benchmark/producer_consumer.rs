//! Producer-consumer pipeline
//!
//! Producers push file paths into one bounded queue, consumers pop them and
//! fold a SHA-256 digest of each file into the run counters. A full queue
//! blocks producers (backpressure); an empty one blocks consumers.
//!
//! ## Shutdown protocol
//!
//! The driver joins every producer first and only then enqueues exactly one
//! `WorkMessage::Shutdown` per consumer. All real items are therefore ahead
//! of every marker, and each consumer leaves after taking exactly one marker.

use std::fs::File;
use std::io::{self, Read};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, SendTimeoutError, Sender};
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use super::control::RunControl;
use super::counters::RunCounters;
use super::pool::ActorPool;
use crate::metrics::ResourceSample;
use crate::sync::StartGate;
use crate::utils::{BenchError, Result};

/// Blocked queue operations wake up this often to check for cancellation
const QUEUE_POLL: Duration = Duration::from_millis(50);

/// Consumers stream files through a buffer of this size
const READ_BUFFER_LEN: usize = 1 << 20;

/// What travels through the queue
///
/// The shutdown marker is its own variant, so no path value, however
/// spelled, can be mistaken for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkMessage {
    Item(PathBuf),
    Shutdown,
}

/// Producer-consumer parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineParams {
    /// Thread budget shared by both roles, at least 2
    pub threads: usize,
    /// Queue capacity, at least 1
    pub capacity: usize,
}

impl PipelineParams {
    pub fn validate(&self) -> Result<()> {
        if self.threads < 2 {
            return Err(BenchError::Config(format!(
                "producer-consumer needs at least 2 threads, got {}",
                self.threads
            )));
        }
        if self.capacity == 0 {
            return Err(BenchError::Config("queue capacity must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Split of the thread budget between producers and consumers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineLayout {
    pub producers: usize,
    pub consumers: usize,
}

impl PipelineLayout {
    /// Half the workers (at least one) produce, the rest consume (at least one)
    pub fn for_threads(threads: usize) -> Self {
        let workers = threads.max(2);
        let mut producers = (workers / 2).max(1);
        let mut consumers = workers - producers;
        if consumers < 1 {
            consumers = 1;
            producers = workers.saturating_sub(consumers).max(1);
        }
        Self {
            producers,
            consumers,
        }
    }

    pub fn workers(&self) -> usize {
        self.producers + self.consumers
    }
}

/// Contiguous slices of `len` items, one per producer, each at most
/// `ceil(len / producers)` long; trailing producers may get nothing
pub fn partition(len: usize, producers: usize) -> Vec<Range<usize>> {
    if len == 0 || producers == 0 {
        return Vec::new();
    }
    let chunk = len.div_ceil(producers);
    (0..producers)
        .map(|index| {
            let start = (index * chunk).min(len);
            start..(start + chunk).min(len)
        })
        .filter(|range| !range.is_empty())
        .collect()
}

/// Streaming SHA-256 of a file, truncated to its first 8 bytes (little-endian)
pub fn digest_file(path: &Path, buffer: &mut [u8]) -> io::Result<u64> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    loop {
        match file.read(buffer) {
            Ok(0) => break,
            Ok(n) => hasher.update(&buffer[..n]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    let digest = hasher.finalize();
    let mut low = [0u8; 8];
    low.copy_from_slice(&digest[..8]);
    Ok(u64::from_le_bytes(low))
}

/// Push one message, waking periodically to honour cancellation
///
/// Returns `Ok(false)` if the run was cancelled before the message fit.
fn send_cancellable(
    queue: &Sender<WorkMessage>,
    message: WorkMessage,
    counters: &RunCounters,
    role: &'static str,
) -> Result<bool> {
    let mut message = message;
    loop {
        match queue.send_timeout(message, QUEUE_POLL) {
            Ok(()) => return Ok(true),
            Err(SendTimeoutError::Timeout(back)) => {
                if counters.is_cancelled() {
                    return Ok(false);
                }
                message = back;
            }
            // Consumers leave on cancellation, which closes the queue
            Err(SendTimeoutError::Disconnected(_)) if counters.is_cancelled() => return Ok(false),
            Err(SendTimeoutError::Disconnected(_)) => return Err(BenchError::QueueClosed { role }),
        }
    }
}

fn produce(
    paths: &[PathBuf],
    queue: &Sender<WorkMessage>,
    counters: &RunCounters,
    gate: &StartGate,
) -> Result<u64> {
    gate.wait();

    let mut pushed = 0u64;
    for path in paths {
        if counters.is_cancelled() {
            break;
        }
        if !send_cancellable(queue, WorkMessage::Item(path.clone()), counters, "producer")? {
            break;
        }
        pushed += 1;
    }
    Ok(pushed)
}

/// What one consumer saw
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConsumerTally {
    pub digested: u64,
    pub failed: u64,
    pub saw_marker: bool,
}

fn consume(
    queue: &Receiver<WorkMessage>,
    counters: &RunCounters,
    gate: &StartGate,
    first_failure: &Mutex<Option<String>>,
) -> ConsumerTally {
    let mut buffer = vec![0u8; READ_BUFFER_LEN];
    let mut tally = ConsumerTally::default();
    gate.wait();

    loop {
        if counters.is_cancelled() {
            break;
        }

        let message = match queue.recv_timeout(QUEUE_POLL) {
            Ok(message) => message,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };

        let path = match message {
            WorkMessage::Shutdown => {
                tally.saw_marker = true;
                break;
            }
            WorkMessage::Item(path) => path,
        };

        match digest_file(&path, &mut buffer) {
            Ok(digest) => {
                counters.record_item(digest);
                counters.record_progress(1);
                tally.digested += 1;
            }
            Err(e) => {
                warn!("Failed to read {}: {}", path.display(), e);
                counters.record_item_failure();
                first_failure
                    .lock()
                    .get_or_insert_with(|| format!("{}: {}", path.display(), e));
                tally.failed += 1;
            }
        }
    }

    tally
}

/// Result of a producer-consumer run
#[derive(Debug)]
pub struct PipelineOutcome {
    /// Items digested
    pub items: u64,
    /// Sum of truncated digests (forced non-zero)
    pub hash_sum: u64,
    /// Producers that had a slice to push
    pub producers: usize,
    pub consumers: usize,
    /// Shutdown markers the driver enqueued
    pub markers_sent: u64,
    /// Shutdown markers consumers took
    pub markers_received: u64,
    /// Baseline taken when the gate opened
    pub sample: ResourceSample,
}

/// Push every path through the pipeline exactly once
pub fn run(paths: Vec<PathBuf>, params: PipelineParams, control: &RunControl) -> Result<PipelineOutcome> {
    params.validate()?;
    if paths.is_empty() {
        return Err(BenchError::Config("producer-consumer needs at least one work item".to_string()));
    }

    let layout = PipelineLayout::for_threads(params.threads);
    let paths: Arc<[PathBuf]> = paths.into();
    let slices = partition(paths.len(), layout.producers);
    debug!(
        "pipeline: {} items, {} producers ({} with work), {} consumers, capacity {}",
        paths.len(),
        layout.producers,
        slices.len(),
        layout.consumers,
        params.capacity
    );

    let (queue_tx, queue_rx) = crossbeam_channel::bounded::<WorkMessage>(params.capacity);
    let first_failure = Arc::new(Mutex::new(None));

    let mut consumers = ActorPool::new("consumer");
    for _ in 0..layout.consumers {
        let queue = queue_rx.clone();
        let counters = Arc::clone(control.counters());
        let gate = Arc::clone(control.gate());
        let first_failure = Arc::clone(&first_failure);

        let spawned = consumers.spawn(move |_| consume(&queue, &counters, &gate, &first_failure));
        if let Err(e) = spawned {
            control.abort();
            return Err(e);
        }
    }
    drop(queue_rx);

    let mut producers = ActorPool::new("producer");
    for slice in slices {
        let paths = Arc::clone(&paths);
        let queue = queue_tx.clone();
        let counters = Arc::clone(control.counters());
        let gate = Arc::clone(control.gate());

        let spawned = producers.spawn(move |_| produce(&paths[slice], &queue, &counters, &gate));
        if let Err(e) = spawned {
            control.abort();
            return Err(e);
        }
    }
    let producer_count = producers.len();

    let sample = control.release();
    let deadline = control.deadline();
    let counters = control.counters();

    let pushed = match producers
        .join(deadline, counters)?
        .into_iter()
        .sum::<Result<u64>>()
    {
        Ok(pushed) => Some(pushed),
        Err(_) if counters.is_cancelled() => None,
        Err(e) => {
            counters.cancel();
            drop(queue_tx);
            consumers.join(deadline, counters)?;
            return Err(e);
        }
    };

    // Every producer has terminated; only now may markers enter the queue.
    let mut markers_sent = 0u64;
    if !counters.is_cancelled() {
        for _ in 0..consumers.len() {
            queue_tx
                .send_deadline(WorkMessage::Shutdown, deadline)
                .map_err(|e| match e {
                    SendTimeoutError::Timeout(_) => BenchError::Timeout {
                        role: "consumer",
                        waited: control.timeout(),
                    },
                    SendTimeoutError::Disconnected(_) => BenchError::QueueClosed { role: "driver" },
                })?;
            markers_sent += 1;
        }
    }
    drop(queue_tx);

    let consumer_count = consumers.len();
    let tallies = consumers.join(deadline, counters)?;
    let markers_received = tallies.iter().filter(|t| t.saw_marker).count() as u64;

    let items = counters.items();
    let failed = counters.item_failures();
    let requested = paths.len() as u64;

    if counters.is_cancelled() {
        return Err(BenchError::Interrupted {
            problem: "pc",
            completed: items + failed,
            requested,
        });
    }
    if failed > 0 {
        let first = first_failure
            .lock()
            .take()
            .unwrap_or_else(|| "unknown item".to_string());
        return Err(BenchError::ItemIo { failed, first });
    }
    debug_assert_eq!(pushed, Some(requested));
    debug_assert_eq!(items, requested);

    info!(
        "Pipeline digested {} items ({} producers / {} consumers, {} markers)",
        items, producer_count, consumer_count, markers_received
    );

    let hash_sum = match counters.hash_sum() {
        0 => 1,
        sum => sum,
    };

    Ok(PipelineOutcome {
        items,
        hash_sum,
        producers: producer_count,
        consumers: consumer_count,
        markers_sent,
        markers_received,
        sample,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::benchmark::control::cancel_at_progress;
    use std::fs;
    use tempfile::TempDir;

    fn write_files(count: usize, len: usize) -> (TempDir, Vec<PathBuf>) {
        let dir = tempfile::tempdir().unwrap();
        let paths = (0..count)
            .map(|i| {
                let path = dir.path().join(format!("file_{:06}.bin", i));
                let content: Vec<u8> = (0..len).map(|b| (b * 31 + i * 7) as u8).collect();
                fs::write(&path, content).unwrap();
                path
            })
            .collect();
        (dir, paths)
    }

    fn run_pipeline(paths: Vec<PathBuf>, threads: usize, capacity: usize) -> Result<PipelineOutcome> {
        let control = RunControl::new(Duration::from_secs(60));
        run(paths, PipelineParams { threads, capacity }, &control)
    }

    #[test]
    fn test_layout_splits_budget() {
        assert_eq!(
            PipelineLayout::for_threads(4),
            PipelineLayout {
                producers: 2,
                consumers: 2
            }
        );
        assert_eq!(
            PipelineLayout::for_threads(5),
            PipelineLayout {
                producers: 2,
                consumers: 3
            }
        );
        // Budget below two is raised to two
        for threads in [0, 1, 2] {
            assert_eq!(
                PipelineLayout::for_threads(threads),
                PipelineLayout {
                    producers: 1,
                    consumers: 1
                }
            );
        }
        assert_eq!(PipelineLayout::for_threads(9).workers(), 9);
    }

    #[test]
    fn test_partition_contiguous_slices() {
        assert_eq!(partition(4, 2), vec![0..2, 2..4]);
        assert_eq!(partition(5, 2), vec![0..3, 3..5]);
        assert_eq!(partition(3, 4), vec![0..1, 1..2, 2..3]);
        assert!(partition(0, 3).is_empty());
        assert!(partition(3, 0).is_empty());
    }

    #[test]
    fn test_partition_covers_every_item_once() {
        for len in 1..40 {
            for producers in 1..9 {
                let slices = partition(len, producers);
                assert!(slices.len() <= producers);
                let mut next = 0;
                for slice in slices {
                    assert_eq!(slice.start, next);
                    next = slice.end;
                }
                assert_eq!(next, len);
            }
        }
    }

    #[test]
    fn test_digest_file_matches_one_shot() {
        let (_dir, paths) = write_files(1, 3000);
        let content = fs::read(&paths[0]).unwrap();
        let digest = Sha256::digest(&content);
        let expected = u64::from_le_bytes(digest[..8].try_into().unwrap());

        // A small buffer forces several reads
        let mut buffer = vec![0u8; 256];
        assert_eq!(digest_file(&paths[0], &mut buffer).unwrap(), expected);
    }

    #[test]
    fn test_single_slot_queue_four_files() {
        let (_dir, paths) = write_files(4, 4096);
        let outcome = run_pipeline(paths, 4, 1).unwrap();

        assert_eq!(outcome.items, 4);
        assert_eq!(outcome.producers, 2);
        assert_eq!(outcome.consumers, 2);
        assert_eq!(outcome.markers_sent, 2);
        assert_eq!(outcome.markers_received, 2);
    }

    #[test]
    fn test_hash_sum_independent_of_layout() {
        let (_dir, paths) = write_files(12, 2048);
        let mut buffer = vec![0u8; 1024];
        let expected = paths
            .iter()
            .map(|p| digest_file(p, &mut buffer).unwrap())
            .fold(0u64, u64::wrapping_add);

        for (threads, capacity) in [(2, 1), (3, 2), (8, 256)] {
            let outcome = run_pipeline(paths.clone(), threads, capacity).unwrap();
            assert_eq!(outcome.items, 12);
            assert_eq!(outcome.hash_sum, expected);
            assert_eq!(outcome.markers_received, outcome.consumers as u64);
        }
    }

    #[test]
    fn test_more_producers_than_items() {
        let (_dir, paths) = write_files(1, 128);
        let outcome = run_pipeline(paths, 8, 1).unwrap();
        assert_eq!(outcome.items, 1);
        assert_eq!(outcome.producers, 1);
        assert_eq!(outcome.consumers, 4);
        assert_eq!(outcome.markers_received, 4);
    }

    #[test]
    fn test_unreadable_item_is_accounted() {
        let (dir, mut paths) = write_files(3, 512);
        paths.insert(1, dir.path().join("missing.bin"));

        let err = run_pipeline(paths, 2, 2).unwrap_err();
        match err {
            BenchError::ItemIo { failed, first } => {
                assert_eq!(failed, 1);
                assert!(first.contains("missing.bin"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_shutdown_marker_is_not_a_path() {
        let marker = WorkMessage::Shutdown;
        assert_ne!(marker, WorkMessage::Item(PathBuf::from("__shutdown__")));
        assert_ne!(marker, WorkMessage::Item(PathBuf::new()));
    }

    #[test]
    fn test_cancel_mid_run_reports_interruption() {
        let (_dir, paths) = write_files(200, 128 * 1024);
        let control = RunControl::new(Duration::from_secs(60));
        let canceller = cancel_at_progress(&control, 1);

        // Single-slot queue: producers are blocked on a full queue when consumers leave
        let err = run(
            paths,
            PipelineParams {
                threads: 4,
                capacity: 1,
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
                assert_eq!(problem, "pc");
                assert_eq!(requested, 200);
                assert!(completed >= 1 && completed < requested, "completed={}", completed);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_closed_queue_after_cancel_is_not_an_error() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        drop(rx);
        let counters = RunCounters::new();
        counters.cancel();
        let sent = send_cancellable(&tx, WorkMessage::Shutdown, &counters, "producer").unwrap();
        assert!(!sent);

        let live = RunCounters::new();
        let err = send_cancellable(&tx, WorkMessage::Shutdown, &live, "producer").unwrap_err();
        assert!(matches!(err, BenchError::QueueClosed { role: "producer" }));
    }

    #[test]
    fn test_invalid_params_rejected() {
        let (_dir, paths) = write_files(1, 16);
        assert!(matches!(
            run_pipeline(paths.clone(), 1, 4),
            Err(BenchError::Config(_))
        ));
        assert!(matches!(run_pipeline(paths, 2, 0), Err(BenchError::Config(_))));
        assert!(matches!(run_pipeline(Vec::new(), 2, 4), Err(BenchError::Config(_))));
    }
}
