//! Metrics collection and reporting
//!
//! This module provides:
//! - Resource sampling (wall clock, CPU time, peak RSS)
//! - The standardized per-run report and its output formats
//! - Mergeable wait-time histograms

pub mod report;
pub mod sampler;
pub mod wait;

pub use report::{BenchReport, MetricsReporter, NoDataReport, OutputFormat, WorkCount};
pub use sampler::{core_count, peak_rss_mb, process_cpu_ms, ResourceSample};
pub use wait::{WaitStats, WaitSummary};
