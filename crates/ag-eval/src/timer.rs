//! Wall-clock timing and resident memory readings.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

/// Named stopwatch started on construction.
#[derive(Debug, Clone)]
pub struct PerformanceTimer {
    name: String,
    started: Instant,
}

/// Result of a stopped [`PerformanceTimer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingReport {
    pub name: String,
    pub elapsed_ms: f64,
}

impl PerformanceTimer {
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            started: Instant::now(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed().as_secs_f64() * 1000.0
    }

    /// Stop the timer and log the measurement at debug level.
    pub fn stop(self) -> TimingReport {
        let elapsed_ms = self.elapsed_ms();
        debug!(timer = %self.name, elapsed_ms, "timer stopped");
        TimingReport {
            name: self.name,
            elapsed_ms,
        }
    }
}

/// Resident set size of the current process in bytes.
///
/// Read from `VmRSS` in `/proc/self/status`; `None` where that is unavailable.
pub fn memory_usage() -> Option<u64> {
    #[cfg(target_os = "linux")]
    {
        let status = std::fs::read_to_string("/proc/self/status").ok()?;
        status
            .lines()
            .find_map(|line| line.strip_prefix("VmRSS:"))
            .and_then(parse_kib)
    }
    #[cfg(not(target_os = "linux"))]
    {
        None
    }
}

/// Parse a `/proc` size field such as `"   10240 kB"` into bytes.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_kib(field: &str) -> Option<u64> {
    let mut parts = field.split_whitespace();
    let value: u64 = parts.next()?.parse().ok()?;
    match parts.next() {
        Some("kB") | None => value.checked_mul(1024),
        _ => None,
    }
}
