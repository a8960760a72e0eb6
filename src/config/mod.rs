//! Configuration module

pub mod bench_config;
pub mod cli;

pub use bench_config::{BenchConfig, Problem};
pub use cli::{CliArgs, CommonArgs, PcArgs, PhilArgs, ProblemArgs, RwArgs};
