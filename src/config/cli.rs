//! Command-line argument parsing
//!
//! One subcommand per coordination problem. Every numeric flag falls back to
//! its `BENCH_*` environment variable, then to the built-in default.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::metrics::OutputFormat;

/// Micro-benchmarks for classic thread-coordination problems
#[derive(Parser, Debug, Clone)]
#[command(name = "concurrency-bench")]
#[command(version, about, long_about = None)]
pub struct CliArgs {
    #[command(subcommand)]
    pub problem: ProblemArgs,

    /// Upper bound on waiting for actors after the start signal, in seconds
    #[arg(
        long = "timeout-secs",
        env = "BENCH_TIMEOUT_SECS",
        default_value_t = 600,
        global = true
    )]
    pub timeout_secs: u64,

    /// Report format written to stdout
    #[arg(long = "format", value_enum, default_value_t = OutputFormat::Json, global = true)]
    pub output_format: OutputFormat,

    /// Quiet mode (no progress bar, errors only)
    #[arg(short = 'q', long = "quiet", global = true)]
    pub quiet: bool,

    /// Verbose output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,
}

/// Problem selection
#[derive(Subcommand, Debug, Clone)]
pub enum ProblemArgs {
    /// Dining philosophers: `threads` philosophers eat `size` rounds each
    Phil(PhilArgs),
    /// Readers-writers: `size * 1000` mixed operations on a shared map
    Rw(RwArgs),
    /// Producer-consumer: digest up to `size` files through a bounded queue
    Pc(PcArgs),
}

/// Flags shared by every problem
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Instance size
    #[arg(long = "size", env = "BENCH_SIZE", default_value_t = 1000)]
    pub size: u64,

    /// Thread budget (0 or absent = number of cores)
    #[arg(long = "threads", env = "BENCH_THREADS")]
    pub threads: Option<usize>,
}

#[derive(Args, Debug, Clone)]
pub struct PhilArgs {
    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Args, Debug, Clone)]
pub struct RwArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Percentage of reads; out-of-range values are clamped to 0..=100
    #[arg(
        long = "read_pct",
        env = "BENCH_READ_PCT",
        default_value_t = 80,
        allow_negative_numbers = true
    )]
    pub read_pct: i64,
}

#[derive(Args, Debug, Clone)]
pub struct PcArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Workload directory
    #[arg(long = "dir", env = "BENCH_DIR", default_value = "bench-data")]
    pub dir: PathBuf,

    /// Queue capacity
    #[arg(long = "buffer", env = "BENCH_BUFFER", default_value_t = 256)]
    pub buffer: usize,

    /// Bytes per generated file
    #[arg(long = "file-size", env = "BENCH_FILE_SIZE", default_value_t = 65536)]
    pub file_size: u64,

    /// Only use files already in the directory
    #[arg(long = "no-generate")]
    pub no_generate: bool,
}

impl CliArgs {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn common(&self) -> &CommonArgs {
        match &self.problem {
            ProblemArgs::Phil(args) => &args.common,
            ProblemArgs::Rw(args) => &args.common,
            ProblemArgs::Pc(args) => &args.common,
        }
    }

    /// Thread budget with 0/absent resolved to the core count
    pub fn effective_threads(&self) -> usize {
        match self.common().threads {
            Some(threads) if threads > 0 => threads,
            _ => std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(4),
        }
    }
}
