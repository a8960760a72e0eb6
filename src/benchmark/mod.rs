//! Benchmark engines and orchestration
//!
//! This module provides the multi-threaded run machinery:
//! - RunCounters / RunControl: shared counters, start gate and run timeout
//! - ActorPool: named actor threads joined under a deadline
//! - Three engines: dining philosophers, readers-writers, producer-consumer
//! - Orchestrator: runs the configured engine and builds its report

pub mod control;
pub mod counters;
pub mod orchestrator;
pub mod philosophers;
pub mod pool;
pub mod producer_consumer;
pub mod readers_writers;

pub use control::{RunControl, DEFAULT_RUN_TIMEOUT};
pub use counters::RunCounters;
pub use orchestrator::{format_count, Orchestrator, RunOutcome};
pub use philosophers::{PhilosophersOutcome, PhilosophersParams};
pub use pool::ActorPool;
pub use producer_consumer::{PipelineLayout, PipelineOutcome, PipelineParams, WorkMessage};
pub use readers_writers::{ReadersWritersOutcome, ReadersWritersParams};
