//! concurrency-bench library
//!
//! Micro-benchmark harness for classic thread-coordination problems:
//! dining philosophers, readers-writers and a bounded producer-consumer
//! pipeline, each reporting wall time, CPU usage and peak memory.

pub mod benchmark;
pub mod config;
pub mod metrics;
pub mod sync;
pub mod utils;
pub mod workload;
