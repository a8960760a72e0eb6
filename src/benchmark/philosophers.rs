//! Dining philosophers engine
//!
//! N philosophers sit in a ring with one fork between each pair of
//! neighbours. Every round a philosopher thinks (local busy work), picks up
//! both adjacent forks, eats (digest of its id and round folded into the
//! shared appetite sum) and puts the forks down.
//!
//! ## Deadlock avoidance
//!
//! Even-indexed philosophers take their left fork first, odd-indexed ones
//! their right fork first. No cyclic wait can form around the ring because
//! two neighbours always contend for their shared fork first or last, never
//! one holding it while the other holds its second.
//!
//! ## Fairness
//!
//! Forks are `TicketLock`s, so waiters are served in arrival order and a
//! fast neighbour cannot starve a slow one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use sha2::{Digest, Sha256};
use tracing::{debug, info};

use super::control::RunControl;
use super::counters::RunCounters;
use super::pool::ActorPool;
use crate::metrics::{ResourceSample, WaitStats, WaitSummary};
use crate::sync::{StartGate, TicketGuard, TicketLock};
use crate::utils::{BenchError, Result};

/// Philosopher `i` seeds its generator with `PHILOSOPHER_SEED_BASE + i`
pub const PHILOSOPHER_SEED_BASE: u64 = 2024;

/// Thinking lasts between 200 and 599 cycles
const THINK_MIN_CYCLES: u32 = 200;
const THINK_SPAN_CYCLES: u32 = 400;

/// Dining philosophers parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhilosophersParams {
    /// Seats around the table (and forks), at least 2
    pub philosophers: usize,
    /// Meals per philosopher, at least 1
    pub rounds: u64,
}

impl PhilosophersParams {
    pub fn validate(&self) -> Result<()> {
        if self.philosophers < 2 {
            return Err(BenchError::Config(format!(
                "dining philosophers needs at least 2 seats, got {}",
                self.philosophers
            )));
        }
        if self.rounds == 0 {
            return Err(BenchError::Config("dining philosophers needs at least 1 round".to_string()));
        }
        if (self.philosophers as u64).checked_mul(self.rounds).is_none() {
            return Err(BenchError::Config(format!(
                "{} philosophers x {} rounds is too many meals",
                self.philosophers, self.rounds
            )));
        }
        Ok(())
    }

    /// Total meals a complete run serves
    pub fn total_meals(&self) -> u64 {
        (self.philosophers as u64).saturating_mul(self.rounds)
    }
}

/// Ring of forks shared by the table
#[derive(Debug)]
pub struct ForkPool {
    forks: Vec<TicketLock>,
    pair_acquisitions: AtomicU64,
    pair_releases: AtomicU64,
}

impl ForkPool {
    pub fn new(seats: usize) -> Self {
        Self {
            forks: (0..seats).map(|_| TicketLock::new()).collect(),
            pair_acquisitions: AtomicU64::new(0),
            pair_releases: AtomicU64::new(0),
        }
    }

    /// (left, right) fork indices of a seat
    pub fn seats(&self, philosopher: usize) -> (usize, usize) {
        (philosopher, (philosopher + 1) % self.forks.len())
    }

    /// Forks in the order `philosopher` must lock them
    pub fn acquisition_order(&self, philosopher: usize) -> [usize; 2] {
        let (left, right) = self.seats(philosopher);
        if philosopher % 2 == 0 {
            [left, right]
        } else {
            [right, left]
        }
    }

    /// Block until both forks of the seat are held
    pub fn acquire_pair(&self, philosopher: usize) -> ForkPair<'_> {
        let [first, second] = self.acquisition_order(philosopher);
        let first = self.forks[first].lock(philosopher);
        let second = self.forks[second].lock(philosopher);
        self.pair_acquisitions.fetch_add(1, Ordering::Relaxed);
        ForkPair {
            pool: self,
            first: Some(first),
            second: Some(second),
        }
    }

    /// Current holder of a fork
    pub fn holder(&self, fork: usize) -> Option<usize> {
        self.forks[fork].holder()
    }

    pub fn pair_acquisitions(&self) -> u64 {
        self.pair_acquisitions.load(Ordering::Acquire)
    }

    pub fn pair_releases(&self) -> u64 {
        self.pair_releases.load(Ordering::Acquire)
    }
}

/// Both forks of one seat; dropping it puts them down
#[derive(Debug)]
pub struct ForkPair<'a> {
    pool: &'a ForkPool,
    first: Option<TicketGuard<'a>>,
    second: Option<TicketGuard<'a>>,
}

impl Drop for ForkPair<'_> {
    fn drop(&mut self) {
        self.second.take();
        self.first.take();
        self.pool.pair_releases.fetch_add(1, Ordering::Relaxed);
    }
}

/// Busy work of one thinking phase; touches no shared state
pub fn thinking_load(philosopher: usize, round: u64, cycles: u32) -> u64 {
    (0..u64::from(cycles))
        .map(|cycle| (cycle + philosopher as u64 + round) % 97)
        .sum()
}

/// Value a meal adds to the appetite sum
///
/// Low 64 bits (little-endian) of SHA-256 over `(philosopher, round)` as two
/// little-endian u64s, plus the preceding thinking load.
pub fn meal_value(philosopher: usize, round: u64, load: u64) -> u64 {
    let mut input = [0u8; 16];
    input[..8].copy_from_slice(&(philosopher as u64).to_le_bytes());
    input[8..].copy_from_slice(&round.to_le_bytes());
    let digest = Sha256::digest(input);

    let mut low = [0u8; 8];
    low.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(low).wrapping_add(load)
}

/// Appetite a run of (philosophers, rounds) must produce, computed serially
///
/// Every contribution depends only on the philosopher's seed, id and round,
/// so the concurrent sum matches this regardless of interleaving.
pub fn reference_appetite(philosophers: usize, rounds: u64) -> u64 {
    let mut total = 0u64;
    for id in 0..philosophers {
        let mut philosopher = Philosopher::new(id);
        for round in 0..rounds {
            let load = philosopher.think(round);
            total = total.wrapping_add(meal_value(id, round, load));
        }
    }
    nonzero(total)
}

fn nonzero(value: u64) -> u64 {
    if value == 0 {
        1
    } else {
        value
    }
}

struct Philosopher {
    id: usize,
    rng: fastrand::Rng,
    waits: WaitStats,
    meals: u64,
}

impl Philosopher {
    fn new(id: usize) -> Self {
        Self {
            id,
            rng: fastrand::Rng::with_seed(PHILOSOPHER_SEED_BASE + id as u64),
            waits: WaitStats::new(),
            meals: 0,
        }
    }

    fn think(&mut self, round: u64) -> u64 {
        let cycles = self
            .rng
            .u32(THINK_MIN_CYCLES..THINK_MIN_CYCLES + THINK_SPAN_CYCLES);
        thinking_load(self.id, round, cycles)
    }

    fn dine(mut self, rounds: u64, forks: &ForkPool, counters: &RunCounters, gate: &StartGate) -> Self {
        gate.wait();

        for round in 0..rounds {
            if counters.is_cancelled() {
                debug!("philosopher {} stopping after {} meals", self.id, self.meals);
                break;
            }

            let load = self.think(round);

            let asked = Instant::now();
            let forks_held = forks.acquire_pair(self.id);
            self.waits.record(asked.elapsed());

            counters.add_appetite(meal_value(self.id, round, load));
            drop(forks_held);

            self.meals += 1;
            counters.record_progress(1);
        }

        self
    }
}

/// Result of a dining philosophers run
#[derive(Debug)]
pub struct PhilosophersOutcome {
    /// Appetite sum (forced non-zero)
    pub appetite: u64,
    /// Meals eaten across the table
    pub meals: u64,
    pub pair_acquisitions: u64,
    pub pair_releases: u64,
    /// Merged fork-pair waits of every philosopher
    pub waits: WaitSummary,
    /// Baseline taken when the gate opened
    pub sample: ResourceSample,
}

/// Run the table to completion
pub fn run(params: PhilosophersParams, control: &RunControl) -> Result<PhilosophersOutcome> {
    params.validate()?;
    debug!(
        "dining philosophers: {} seats, {} rounds",
        params.philosophers, params.rounds
    );

    let forks = Arc::new(ForkPool::new(params.philosophers));
    let mut pool = ActorPool::new("philosopher");

    for id in 0..params.philosophers {
        let forks = Arc::clone(&forks);
        let counters = Arc::clone(control.counters());
        let gate = Arc::clone(control.gate());
        let rounds = params.rounds;

        let spawned = pool.spawn(move |_| Philosopher::new(id).dine(rounds, &forks, &counters, &gate));
        if let Err(e) = spawned {
            control.abort();
            return Err(e);
        }
    }

    let sample = control.release();
    let philosophers = pool.join(control.deadline(), control.counters())?;

    let mut waits = WaitStats::new();
    let mut meals = 0u64;
    for philosopher in &philosophers {
        waits.merge(&philosopher.waits);
        meals += philosopher.meals;
    }

    let requested = params.total_meals();
    if control.counters().is_cancelled() || meals != requested {
        return Err(BenchError::Interrupted {
            problem: "phil",
            completed: meals,
            requested,
        });
    }

    let waits = waits.summary();
    info!("Fork waits: {}", waits.format());

    Ok(PhilosophersOutcome {
        appetite: nonzero(control.counters().appetite()),
        meals,
        pair_acquisitions: forks.pair_acquisitions(),
        pair_releases: forks.pair_releases(),
        waits,
        sample,
    })
}
