//! concurrency-bench - micro-benchmarks for thread-coordination problems
//!
//! Runs one of dining philosophers, readers-writers or a producer-consumer
//! pipeline and prints a single report line on stdout.

use anyhow::Result;
use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;

use concurrency_bench::benchmark::{Orchestrator, RunOutcome};
use concurrency_bench::config::{BenchConfig, CliArgs};
use concurrency_bench::metrics::MetricsReporter;
use concurrency_bench::utils::install_interrupt_handler;

fn setup_logging(verbose: bool, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else if verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    // stdout carries the report only
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

fn run() -> Result<()> {
    // Parse CLI arguments
    let args = CliArgs::parse_args();

    // Setup logging
    setup_logging(args.verbose, args.quiet);

    // Build configuration
    let config = BenchConfig::from_cli(&args)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;

    install_interrupt_handler();

    let reporter = MetricsReporter::new(config.output_format);
    let orchestrator = Orchestrator::new(config)?;

    match orchestrator.run()? {
        RunOutcome::Report(report) => reporter.report(&report)?,
        RunOutcome::NoData(no_data) => reporter.report_no_data(&no_data)?,
    }

    Ok(())
}

fn main() {
    if let Err(e) = run() {
        error!("Error: {:#}", e);
        std::process::exit(1);
    }
}
