//! FIFO ticket lock
//!
//! `parking_lot::Mutex` is only eventually fair, so a waiter can lose the race
//! to a neighbour that releases and re-locks in a tight loop. The ticket lock
//! serves waiters strictly in arrival order: each acquirer draws a ticket and
//! proceeds when `now_serving` reaches it.

use parking_lot::{Condvar, Mutex};

#[derive(Debug, Default)]
struct TicketState {
    next_ticket: u64,
    now_serving: u64,
    holder: Option<usize>,
}

/// Exclusive, FIFO-fair lock without payload
#[derive(Debug, Default)]
pub struct TicketLock {
    state: Mutex<TicketState>,
    turn: Condvar,
}

impl TicketLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock on behalf of `owner`, waiting behind earlier tickets
    pub fn lock(&self, owner: usize) -> TicketGuard<'_> {
        let mut state = self.state.lock();
        let ticket = state.next_ticket;
        state.next_ticket += 1;

        while state.now_serving != ticket {
            self.turn.wait(&mut state);
        }

        debug_assert!(state.holder.is_none(), "ticket lock handed to two holders");
        state.holder = Some(owner);
        TicketGuard { lock: self }
    }

    fn unlock(&self) {
        let mut state = self.state.lock();
        state.holder = None;
        state.now_serving += 1;
        // Condvar cannot target one waiter, so every waiter wakes and all but
        // the next ticket park again. A fork has two contenders, so that is
        // at most one spurious wakeup per release.
        self.turn.notify_all();
    }

    /// Current holder, if any
    pub fn holder(&self) -> Option<usize> {
        self.state.lock().holder
    }

    /// Holder plus waiters currently queued on the lock
    pub fn queued(&self) -> u64 {
        let state = self.state.lock();
        state.next_ticket - state.now_serving
    }
}

/// RAII guard; the lock is released when the guard is dropped
#[derive(Debug)]
pub struct TicketGuard<'a> {
    lock: &'a TicketLock,
}

impl Drop for TicketGuard<'_> {
    fn drop(&mut self) {
        self.lock.unlock();
    }
}
