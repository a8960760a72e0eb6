//! Error types for concurrency-bench

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum BenchError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to provision workload at {path}: {source}")]
    Provision {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("No workload files found in {dir}")]
    EmptyWorkload { dir: PathBuf },

    #[error("{role} actors did not finish within {waited:?}")]
    Timeout { role: &'static str, waited: Duration },

    #[error("{problem} run interrupted after {completed} of {requested} units")]
    Interrupted {
        problem: &'static str,
        completed: u64,
        requested: u64,
    },

    #[error("{failed} work item(s) could not be read (first: {first})")]
    ItemIo { failed: u64, first: String },

    #[error("Failed to spawn actor thread: {0}")]
    Spawn(#[source] io::Error),

    #[error("A {role} actor panicked")]
    ActorPanicked { role: &'static str },

    #[error("Work queue closed while {role} was still sending")]
    QueueClosed { role: &'static str },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Report serialization failed: {0}")]
    Report(#[from] serde_json::Error),
}

impl BenchError {
    /// True for the outcome that is reported as "no data" instead of a failure
    pub fn is_empty_workload(&self) -> bool {
        matches!(self, BenchError::EmptyWorkload { .. })
    }
}

pub type Result<T> = std::result::Result<T, BenchError>;
