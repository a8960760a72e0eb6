//! Metrics reporter - output formatting
//!
//! Supports two output formats:
//! - JSON (one object per line, the default)
//! - Text (human-readable)

use std::io::{self, Write};

use clap::ValueEnum;
use serde::Serialize;

use crate::utils::Result;

/// Output format for reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    Text,
}

/// The one work counter that is meaningful for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkCount {
    /// Producer-consumer: files digested
    Items(u64),
    /// Readers-writers: operations executed
    Operations(u64),
    /// Dining philosophers: meals eaten (philosophers x rounds)
    Iterations(u64),
}

impl WorkCount {
    /// (items, operations, iterations) with the unused two at zero
    pub fn split(self) -> (u64, u64, u64) {
        match self {
            WorkCount::Items(n) => (n, 0, 0),
            WorkCount::Operations(n) => (0, n, 0),
            WorkCount::Iterations(n) => (0, 0, n),
        }
    }
}

/// Standardized result of one benchmark run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchReport {
    pub problem: String,
    pub size: u64,
    pub threads: usize,
    pub wall_ms: f64,
    pub cpu_ms: f64,
    pub cpu_pct: f64,
    pub cpu_pct_per_core: f64,
    pub rss_mb: f64,
    pub items_processed: u64,
    pub operations: u64,
    pub iterations: u64,
}

impl BenchReport {
    /// Serialize as a single JSON line
    pub fn to_json_line(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Human-readable one-line summary
    pub fn to_text(&self) -> String {
        let work = match (self.items_processed, self.operations, self.iterations) {
            (n, 0, 0) if n > 0 => format!("items={}", n),
            (0, n, 0) if n > 0 => format!("operations={}", n),
            (0, 0, n) => format!("iterations={}", n),
            (i, o, n) => format!("items={} operations={} iterations={}", i, o, n),
        };
        format!(
            "{} size={} threads={} wall={:.3}ms cpu={:.3}ms cpu%={:.1} cpu%/core={:.1} rss={:.1}MB {}",
            self.problem,
            self.size,
            self.threads,
            self.wall_ms,
            self.cpu_ms,
            self.cpu_pct,
            self.cpu_pct_per_core,
            self.rss_mb,
            work
        )
    }
}

/// Explicit "no data" outcome for an empty producer-consumer workload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoDataReport {
    pub problem: String,
    pub error: &'static str,
    pub dir: String,
}

impl NoDataReport {
    pub const NO_FILES: &'static str = "no files found";

    pub fn no_files(problem: &str, dir: &std::path::Path) -> Self {
        Self {
            problem: problem.to_string(),
            error: Self::NO_FILES,
            dir: dir.display().to_string(),
        }
    }
}

/// Writes reports in the configured format
pub struct MetricsReporter {
    format: OutputFormat,
}

impl MetricsReporter {
    /// Create new reporter with specified format
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Write one report line
    pub fn write_report<W: Write>(&self, out: &mut W, report: &BenchReport) -> Result<()> {
        let line = match self.format {
            OutputFormat::Json => report.to_json_line()?,
            OutputFormat::Text => report.to_text(),
        };
        writeln!(out, "{}", line)?;
        Ok(())
    }

    /// Write the no-data marker line
    pub fn write_no_data<W: Write>(&self, out: &mut W, no_data: &NoDataReport) -> Result<()> {
        let line = match self.format {
            OutputFormat::Json => serde_json::to_string(no_data)?,
            OutputFormat::Text => format!("{}: {} in {}", no_data.problem, no_data.error, no_data.dir),
        };
        writeln!(out, "{}", line)?;
        Ok(())
    }

    /// Write a report to stdout
    pub fn report(&self, report: &BenchReport) -> Result<()> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        self.write_report(&mut out, report)?;
        out.flush()?;
        Ok(())
    }

    /// Write the no-data marker to stdout
    pub fn report_no_data(&self, no_data: &NoDataReport) -> Result<()> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        self.write_no_data(&mut out, no_data)?;
        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report() -> BenchReport {
        BenchReport {
            problem: "pc".to_string(),
            size: 4,
            threads: 4,
            wall_ms: 12.5,
            cpu_ms: 20.0,
            cpu_pct: 160.0,
            cpu_pct_per_core: 20.0,
            rss_mb: 8.0,
            items_processed: 4,
            operations: 0,
            iterations: 0,
        }
    }

    #[test]
    fn test_work_count_split() {
        assert_eq!(WorkCount::Items(3).split(), (3, 0, 0));
        assert_eq!(WorkCount::Operations(7).split(), (0, 7, 0));
        assert_eq!(WorkCount::Iterations(9).split(), (0, 0, 9));
    }

    #[test]
    fn test_json_line_fields() {
        let line = sample_report().to_json_line().unwrap();
        assert!(!line.contains('\n'));

        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["problem"], "pc");
        assert_eq!(value["size"], 4);
        assert_eq!(value["threads"], 4);
        assert_eq!(value["items_processed"], 4);
        assert_eq!(value["operations"], 0);
        assert_eq!(value["iterations"], 0);
        assert_eq!(value["wall_ms"], 12.5);
        assert!(value.get("rss_mb").is_some());
        assert!(value.get("cpu_pct_per_core").is_some());
    }

    #[test]
    fn test_text_format() {
        let text = sample_report().to_text();
        assert!(text.starts_with("pc size=4 threads=4"));
        assert!(text.ends_with("items=4"));
    }

    #[test]
    fn test_write_no_data_json() {
        let reporter = MetricsReporter::new(OutputFormat::Json);
        let mut out = Vec::new();
        let no_data = NoDataReport::no_files("pc", std::path::Path::new("/data/pc"));
        reporter.write_no_data(&mut out, &no_data).unwrap();

        let line = String::from_utf8(out).unwrap();
        let value: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(value["error"], "no files found");
        assert_eq!(value["problem"], "pc");
        assert_eq!(value["dir"], "/data/pc");
    }

    #[test]
    fn test_reporter_formats() {
        let report = sample_report();

        let mut json = Vec::new();
        MetricsReporter::new(OutputFormat::Json)
            .write_report(&mut json, &report)
            .unwrap();
        assert!(String::from_utf8(json).unwrap().starts_with('{'));

        let mut text = Vec::new();
        let reporter = MetricsReporter::new(OutputFormat::Text);
        assert_eq!(reporter.format(), OutputFormat::Text);
        reporter.write_report(&mut text, &report).unwrap();
        assert!(String::from_utf8(text).unwrap().starts_with("pc "));
    }
}
