//! Benchmark orchestrator - dispatches one run and builds its report

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use super::control::RunControl;
use super::counters::RunCounters;
use super::philosophers::{self, PhilosophersParams};
use super::producer_consumer::{self, PipelineParams};
use super::readers_writers::{self, ReadersWritersParams};
use crate::config::{BenchConfig, Problem};
use crate::metrics::{BenchReport, NoDataReport, WorkCount};
use crate::utils::{BenchError, Result};
use crate::workload::{FileWorkload, WorkloadSource};

/// What a run produced
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Report(BenchReport),
    /// Producer-consumer found nothing to process
    NoData(NoDataReport),
}

/// Runs the configured problem
pub struct Orchestrator {
    config: Arc<BenchConfig>,
}

impl Orchestrator {
    pub fn new(config: BenchConfig) -> Result<Self> {
        config.validate().map_err(BenchError::Config)?;
        Ok(Self {
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    /// Execute the run to completion
    pub fn run(&self) -> Result<RunOutcome> {
        debug!(
            "Running {} with size={} threads={}",
            self.config.problem, self.config.size, self.config.threads
        );
        match self.config.problem {
            Problem::Philosophers => self.run_philosophers().map(RunOutcome::Report),
            Problem::ReadersWriters => self.run_readers_writers().map(RunOutcome::Report),
            Problem::ProducerConsumer => self.run_producer_consumer(),
        }
    }

    fn control(&self) -> RunControl {
        RunControl::new(self.config.timeout)
    }

    fn run_philosophers(&self) -> Result<BenchReport> {
        let params = PhilosophersParams {
            philosophers: self.config.threads,
            rounds: self.config.size,
        };
        let control = self.control();

        self.with_progress(&control, params.total_meals(), |control| {
            let outcome = philosophers::run(params, control)?;
            let report = outcome.sample.finish(
                Problem::Philosophers.as_str(),
                self.config.size,
                self.config.threads,
                WorkCount::Iterations(outcome.meals),
            );
            info!(
                "Appetite {} over {} meals ({} pair acquisitions)",
                outcome.appetite, outcome.meals, outcome.pair_acquisitions
            );
            Ok(report)
        })
    }

    fn run_readers_writers(&self) -> Result<BenchReport> {
        let params = ReadersWritersParams {
            size: self.config.size,
            workers: self.config.threads,
            read_pct: self.config.read_pct,
        };
        let control = self.control();

        self.with_progress(&control, params.total_operations(), |control| {
            let outcome = readers_writers::run(params, control)?;
            Ok(outcome.sample.finish(
                Problem::ReadersWriters.as_str(),
                self.config.size,
                self.config.threads,
                WorkCount::Operations(outcome.operations),
            ))
        })
    }

    fn run_producer_consumer(&self) -> Result<RunOutcome> {
        let workload = FileWorkload::new(&self.config.dir)
            .with_file_len(self.config.file_size)
            .with_generate(self.config.generate);

        let paths = match workload.resolve(self.config.size) {
            Ok(paths) => paths,
            Err(e) if e.is_empty_workload() => {
                warn!("{}", e);
                return Ok(RunOutcome::NoData(NoDataReport::no_files(
                    Problem::ProducerConsumer.as_str(),
                    workload.dir(),
                )));
            }
            Err(e) => return Err(e),
        };

        let params = PipelineParams {
            threads: self.config.threads,
            capacity: self.config.buffer,
        };
        let control = self.control();
        let total = paths.len() as u64;

        let report = self.with_progress(&control, total, |control| {
            let outcome = producer_consumer::run(paths, params, control)?;
            let report = outcome.sample.finish(
                Problem::ProducerConsumer.as_str(),
                self.config.size,
                self.config.threads,
                WorkCount::Items(outcome.items),
            );
            info!("Hash sum {:#018x} over {} items", outcome.hash_sum, outcome.items);
            Ok(report)
        })?;

        Ok(RunOutcome::Report(report))
    }

    /// Run `body` with a progress reporter attached to the run's counters
    fn with_progress<F>(&self, control: &RunControl, total: u64, body: F) -> Result<BenchReport>
    where
        F: FnOnce(&RunControl) -> Result<BenchReport>,
    {
        let reporter = if self.config.quiet {
            None
        } else {
            let counters = Arc::clone(control.counters());
            let handle = thread::Builder::new()
                .name("progress".to_string())
                .spawn(move || report_progress(&counters, total))
                .map_err(BenchError::Spawn)?;
            Some(handle)
        };

        let result = body(control);

        control.counters().mark_finished();
        if let Some(handle) = reporter {
            if handle.join().is_err() {
                warn!("Progress reporter panicked");
            }
        }
        result
    }
}

/// Render progress on stderr until the run finishes or is cancelled
fn report_progress(counters: &RunCounters, total: u64) {
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({msg})")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    pb.set_style(style);

    let mut last_done = 0u64;
    let mut last_time = Instant::now();

    while !counters.is_finished() && !counters.is_cancelled() {
        let done = counters.progress();
        pb.set_position(done);

        let now = Instant::now();
        let interval = now.duration_since(last_time).as_secs_f64();
        if interval >= 0.5 {
            let throughput = done.saturating_sub(last_done) as f64 / interval;
            pb.set_message(format!("{}/s", format_count(throughput as u64)));
            last_done = done;
            last_time = now;
        }

        if done >= total {
            break;
        }

        thread::sleep(Duration::from_millis(100));
    }

    pb.set_position(counters.progress());
    if counters.is_cancelled() {
        pb.abandon_with_message("interrupted");
    } else {
        pb.finish_with_message("done");
    }
}

/// Format large numbers with thousands separators
/// Examples: 1,234,567 or 987,654
pub fn format_count(value: u64) -> String {
    let s = value.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.insert(0, ',');
        }
        result.insert(0, c);
    }
    result
}
