//! Fixed-size actor pools
//!
//! One pool per actor role per engine. Each actor runs on its own named OS
//! thread and holds a clone of the pool's completion sender; the channel
//! disconnects once every actor has returned (or unwound), which is what
//! `join` waits for under the run deadline.

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use tracing::{debug, warn};

use super::counters::RunCounters;
use crate::utils::{interrupted, BenchError, Result};

/// How often a joining driver wakes up to check the deadline and SIGINT
const JOIN_POLL: Duration = Duration::from_millis(50);

/// Group of actor threads sharing one role
pub struct ActorPool<T> {
    role: &'static str,
    handles: Vec<JoinHandle<T>>,
    done_tx: Sender<()>,
    done_rx: Receiver<()>,
}

impl<T: Send + 'static> ActorPool<T> {
    /// Create an empty pool for `role` (used in thread names and errors)
    pub fn new(role: &'static str) -> Self {
        let (done_tx, done_rx) = crossbeam_channel::unbounded();
        Self {
            role,
            handles: Vec::new(),
            done_tx,
            done_rx,
        }
    }

    /// Start one actor; the closure receives the actor's index in the pool
    pub fn spawn<F>(&mut self, actor: F) -> Result<()>
    where
        F: FnOnce(usize) -> T + Send + 'static,
    {
        let index = self.handles.len();
        let done = self.done_tx.clone();

        let handle = thread::Builder::new()
            .name(format!("{}-{}", self.role, index))
            .spawn(move || {
                // Dropped on return and on unwind alike
                let _done = done;
                actor(index)
            })
            .map_err(BenchError::Spawn)?;

        self.handles.push(handle);
        Ok(())
    }

    /// Number of actors started
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for every actor until `deadline`
    ///
    /// A pending SIGINT is forwarded to `counters` as cancellation. Passing
    /// the deadline cancels the run and fails with `Timeout`; the stuck
    /// threads are left detached.
    pub fn join(self, deadline: Instant, counters: &RunCounters) -> Result<Vec<T>> {
        let ActorPool {
            role,
            handles,
            done_tx,
            done_rx,
        } = self;
        drop(done_tx);

        let started = Instant::now();
        loop {
            let now = Instant::now();
            if now >= deadline {
                counters.cancel();
                warn!("{} {} actor(s) still running at the deadline", handles.len(), role);
                return Err(BenchError::Timeout {
                    role,
                    waited: started.elapsed(),
                });
            }

            match done_rx.recv_timeout(JOIN_POLL.min(deadline - now)) {
                Ok(()) => {}
                Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {
                    if interrupted() && !counters.is_cancelled() {
                        warn!("Interrupt received, cancelling {} actors", role);
                        counters.cancel();
                    }
                }
            }
        }

        debug!("{} {} actor(s) joined in {:?}", handles.len(), role, started.elapsed());

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            results.push(handle.join().map_err(|_| BenchError::ActorPanicked { role })?);
        }
        Ok(results)
    }
}
