//! Workload sources for the producer-consumer pipeline
//!
//! A workload is an ordered list of file paths. `FileWorkload` resolves it
//! from a directory, generating deterministic files on demand.

pub mod files;
pub mod source;

pub use files::{FileWorkload, DEFAULT_FILE_LEN, FILE_EXTENSION, WORKLOAD_SEED};
pub use source::WorkloadSource;
