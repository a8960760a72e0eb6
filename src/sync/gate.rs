//! One-shot start gate
//!
//! Every actor of an engine parks on the gate after it has been spawned and
//! set up; the driver opens it once, releasing all of them together so thread
//! creation is kept out of the timed region.

use parking_lot::{Condvar, Mutex};

/// One-shot gate: closed until `open` is called, then open forever
#[derive(Debug, Default)]
pub struct StartGate {
    open: Mutex<bool>,
    released: Condvar,
}

impl StartGate {
    /// Create a closed gate
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until the gate is opened
    pub fn wait(&self) {
        let mut open = self.open.lock();
        while !*open {
            self.released.wait(&mut open);
        }
    }

    /// Open the gate, releasing all current and future waiters
    ///
    /// Opening an already open gate does nothing.
    pub fn open(&self) {
        let mut open = self.open.lock();
        if !*open {
            *open = true;
            self.released.notify_all();
        }
    }

    /// Whether the gate has been opened
    pub fn is_open(&self) -> bool {
        *self.open.lock()
    }
}
