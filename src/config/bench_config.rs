//! Benchmark configuration derived from CLI arguments

use super::cli::{CliArgs, ProblemArgs};
use crate::benchmark::readers_writers::{KEY_SPACE_FACTOR, OPERATIONS_PER_SIZE};
use crate::metrics::OutputFormat;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// The coordination problem a run exercises
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Problem {
    Philosophers,
    ReadersWriters,
    ProducerConsumer,
}

impl Problem {
    /// Tag used in reports and on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            Problem::Philosophers => "phil",
            Problem::ReadersWriters => "rw",
            Problem::ProducerConsumer => "pc",
        }
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Complete benchmark configuration
///
/// `size` and `threads` hold the effective, already clamped values:
/// rounds and philosophers for `phil`, size and workers for `rw`, requested
/// file count and total pipeline threads for `pc`.
#[derive(Debug, Clone)]
pub struct BenchConfig {
    pub problem: Problem,
    pub size: u64,
    pub threads: usize,

    // Readers-writers
    pub read_pct: u32,

    // Producer-consumer
    pub dir: PathBuf,
    pub buffer: usize,
    pub file_size: u64,
    pub generate: bool,

    // Run
    pub timeout: Duration,
    pub output_format: OutputFormat,
    pub quiet: bool,
}

impl BenchConfig {
    /// Create configuration from CLI arguments
    pub fn from_cli(args: &CliArgs) -> Result<Self, String> {
        let requested_threads = args.effective_threads();
        let size = args.common().size.max(1);

        let mut config = Self {
            problem: Problem::Philosophers,
            size,
            threads: requested_threads,
            read_pct: 0,
            dir: PathBuf::new(),
            buffer: 1,
            file_size: 0,
            generate: false,
            timeout: Duration::from_secs(args.timeout_secs),
            output_format: args.output_format,
            quiet: args.quiet,
        };

        match &args.problem {
            ProblemArgs::Phil(_) => {
                config.problem = Problem::Philosophers;
                config.threads = requested_threads.max(2);
            }
            ProblemArgs::Rw(rw) => {
                config.problem = Problem::ReadersWriters;
                config.threads = requested_threads.max(1);
                config.read_pct = rw.read_pct.clamp(0, 100) as u32;
            }
            ProblemArgs::Pc(pc) => {
                config.problem = Problem::ProducerConsumer;
                config.threads = requested_threads.max(2);
                config.dir = pc.dir.clone();
                config.buffer = pc.buffer.max(1);
                config.file_size = pc.file_size;
                config.generate = !pc.no_generate;
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject combinations no engine can run
    pub fn validate(&self) -> Result<(), String> {
        if self.timeout.is_zero() {
            return Err("--timeout-secs must be at least 1".to_string());
        }

        match self.problem {
            Problem::Philosophers => {
                if self.threads < 2 {
                    return Err("dining philosophers needs at least 2 philosophers".to_string());
                }
                if (self.threads as u64).checked_mul(self.size).is_none() {
                    return Err(format!(
                        "--size {} with {} philosophers is too many meals",
                        self.size, self.threads
                    ));
                }
            }
            Problem::ReadersWriters => {
                if self.size.checked_mul(OPERATIONS_PER_SIZE).is_none()
                    || self.size.checked_mul(KEY_SPACE_FACTOR).is_none()
                {
                    return Err(format!("--size {} is too large for readers-writers", self.size));
                }
                if self.read_pct > 100 {
                    return Err("--read_pct must be within 0..=100".to_string());
                }
            }
            Problem::ProducerConsumer => {
                if self.file_size == 0 {
                    return Err("--file-size must be at least 1".to_string());
                }
                if self.threads < 2 {
                    return Err("producer-consumer needs at least 2 threads".to_string());
                }
            }
        }

        Ok(())
    }
}
