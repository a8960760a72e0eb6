//! Process resource sampling
//!
//! A run captures a `ResourceSample` right before the start gate opens and
//! turns it into a `BenchReport` after every actor has joined. Wall time comes
//! from a monotonic clock, CPU time and the RSS fallback from `getrusage`.

use std::fs;
use std::time::Instant;

use super::report::{BenchReport, WorkCount};

/// Baseline taken at the start of the timed region
#[derive(Debug, Clone, Copy)]
pub struct ResourceSample {
    started: Instant,
    cpu_ms: f64,
}

impl ResourceSample {
    /// Capture the current wall clock and process CPU time
    pub fn capture() -> Self {
        Self {
            started: Instant::now(),
            cpu_ms: process_cpu_ms(),
        }
    }

    /// Wall-clock milliseconds since the sample was captured
    pub fn elapsed_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1000.0
    }

    /// Close the sample and build the report for one run
    pub fn finish(&self, problem: &str, size: u64, threads: usize, work: WorkCount) -> BenchReport {
        let wall_ms = self.elapsed_ms();
        let cpu_ms = (process_cpu_ms() - self.cpu_ms).max(0.0);
        let cpu_pct = if wall_ms > 0.0 {
            cpu_ms / wall_ms * 100.0
        } else {
            0.0
        };
        let (items_processed, operations, iterations) = work.split();

        BenchReport {
            problem: problem.to_string(),
            size,
            threads,
            wall_ms,
            cpu_ms,
            cpu_pct,
            cpu_pct_per_core: cpu_pct / core_count() as f64,
            rss_mb: peak_rss_mb(),
            items_processed,
            operations,
            iterations,
        }
    }
}

/// Number of logical cores available to the process
pub fn core_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[cfg(unix)]
fn rusage_self() -> Option<libc::rusage> {
    let mut usage = std::mem::MaybeUninit::<libc::rusage>::zeroed();
    // SAFETY: getrusage fills the struct we pass and only reads RUSAGE_SELF.
    let rc = unsafe { libc::getrusage(libc::RUSAGE_SELF, usage.as_mut_ptr()) };
    if rc == 0 {
        // SAFETY: initialised by the successful call above.
        Some(unsafe { usage.assume_init() })
    } else {
        None
    }
}

/// User + system CPU time consumed by the process, in milliseconds
#[cfg(unix)]
pub fn process_cpu_ms() -> f64 {
    let Some(usage) = rusage_self() else {
        return 0.0;
    };
    let to_ms = |tv: libc::timeval| tv.tv_sec as f64 * 1000.0 + tv.tv_usec as f64 / 1000.0;
    to_ms(usage.ru_utime) + to_ms(usage.ru_stime)
}

#[cfg(not(unix))]
pub fn process_cpu_ms() -> f64 {
    0.0
}

/// Peak resident set size in MiB
///
/// Prefers `VmHWM` from /proc; otherwise falls back to `ru_maxrss`
/// (kilobytes on Linux, bytes on macOS).
pub fn peak_rss_mb() -> f64 {
    if let Some(kb) = fs::read_to_string("/proc/self/status")
        .ok()
        .and_then(|status| parse_status_kb(&status, "VmHWM:"))
    {
        return kb / 1024.0;
    }
    max_rss_fallback_mb()
}

#[cfg(unix)]
fn max_rss_fallback_mb() -> f64 {
    let Some(usage) = rusage_self() else {
        return 0.0;
    };
    let raw = usage.ru_maxrss as f64;
    if cfg!(target_os = "macos") {
        raw / (1024.0 * 1024.0)
    } else {
        raw / 1024.0
    }
}

#[cfg(not(unix))]
fn max_rss_fallback_mb() -> f64 {
    0.0
}

/// Extract the kB value of a `/proc/<pid>/status` field
fn parse_status_kb(status: &str, field: &str) -> Option<f64> {
    status
        .lines()
        .find(|line| line.starts_with(field))
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|value| value.parse::<f64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status_kb() {
        let status = "Name:\tbench\nVmPeak:\t  20000 kB\nVmHWM:\t    4096 kB\nVmRSS:\t    2048 kB\n";
        assert_eq!(parse_status_kb(status, "VmHWM:"), Some(4096.0));
        assert_eq!(parse_status_kb(status, "VmRSS:"), Some(2048.0));
        assert_eq!(parse_status_kb(status, "VmSwap:"), None);
    }

    #[test]
    fn test_finish_builds_report() {
        let sample = ResourceSample::capture();
        // Burn a little CPU so the numbers are not all zero
        let mut acc = 0u64;
        for i in 0..200_000u64 {
            acc = acc.wrapping_add(i * i);
        }
        std::hint::black_box(acc);

        let report = sample.finish("rw", 3, 2, WorkCount::Operations(3000));
        assert_eq!(report.problem, "rw");
        assert_eq!(report.size, 3);
        assert_eq!(report.threads, 2);
        assert_eq!(report.operations, 3000);
        assert_eq!(report.items_processed, 0);
        assert_eq!(report.iterations, 0);
        assert!(report.wall_ms >= 0.0);
        assert!(report.cpu_ms >= 0.0);
        assert!(report.cpu_pct_per_core <= report.cpu_pct);
    }

    #[test]
    fn test_core_count_positive() {
        assert!(core_count() >= 1);
    }
}
