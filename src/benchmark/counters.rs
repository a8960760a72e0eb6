//! Run-wide atomic counters
//!
//! These are the only state actors share besides the engine's own structure
//! (forks, store or queue). They are written during the run and read once
//! after every actor has joined.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Counters shared between all actors of one run
///
/// Accumulators use relaxed fetch_add; the join establishes the
/// happens-before edge for the final reads.
#[derive(Debug, Default)]
pub struct RunCounters {
    /// Dining philosophers: sum of meal values (wrapping)
    pub appetite: AtomicU64,

    /// Readers-writers: operations executed
    pub operations: AtomicU64,

    /// Producer-consumer: items digested
    pub items: AtomicU64,

    /// Producer-consumer: sum of truncated digests (wrapping)
    pub hash_sum: AtomicU64,

    /// Producer-consumer: items that could not be read
    pub item_failures: AtomicU64,

    /// Units of work finished so far (drives the progress bar)
    pub progress: AtomicU64,

    /// Cancellation flag, checked by actors at every loop iteration
    cancelled: AtomicBool,

    /// Set by the driver once all actors joined (stops the progress reporter)
    finished: AtomicBool,
}

impl RunCounters {
    /// Create new counters initialized to zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a meal value to the appetite sum
    #[inline]
    pub fn add_appetite(&self, value: u64) {
        self.appetite.fetch_add(value, Ordering::Relaxed);
    }

    /// Record a batch of executed operations
    #[inline]
    pub fn add_operations(&self, count: u64) {
        self.operations.fetch_add(count, Ordering::Relaxed);
    }

    /// Record one digested item
    #[inline]
    pub fn record_item(&self, digest: u64) {
        self.hash_sum.fetch_add(digest, Ordering::Relaxed);
        self.items.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an item that could not be read
    #[inline]
    pub fn record_item_failure(&self) {
        self.item_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Advance the progress counter
    #[inline]
    pub fn record_progress(&self, units: u64) {
        self.progress.fetch_add(units, Ordering::Relaxed);
    }

    /// Ask every actor to stop at its next loop iteration
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Check if cancellation has been requested
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Mark the run as finished
    pub fn mark_finished(&self) {
        self.finished.store(true, Ordering::SeqCst);
    }

    /// Check if the run has finished
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Relaxed)
    }

    pub fn appetite(&self) -> u64 {
        self.appetite.load(Ordering::Acquire)
    }

    pub fn operations(&self) -> u64 {
        self.operations.load(Ordering::Acquire)
    }

    pub fn items(&self) -> u64 {
        self.items.load(Ordering::Acquire)
    }

    pub fn hash_sum(&self) -> u64 {
        self.hash_sum.load(Ordering::Acquire)
    }

    pub fn item_failures(&self) -> u64 {
        self.item_failures.load(Ordering::Acquire)
    }

    pub fn progress(&self) -> u64 {
        self.progress.load(Ordering::Relaxed)
    }
}
