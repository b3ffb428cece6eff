//! Per-side latency accounting

use std::fmt;
use std::time::Duration;

/// Running total of transfer time for one side of the run
///
/// Owned by the producer or consumer context, never global; read once at
/// shutdown for the final report.
#[derive(Default, Clone, Copy)]
pub struct Latency {
    total: Duration,
    transfers: u64,
}

impl Latency {
    /// Fold one transfer's duration into the total
    pub fn record(&mut self, sample: Duration) {
        self.total += sample;
        self.transfers += 1;
    }

    /// Accumulated transfer time
    pub fn total(&self) -> Duration {
        self.total
    }

    /// Number of transfers recorded
    pub fn transfers(&self) -> u64 {
        self.transfers
    }
}

// Seconds with nanosecond precision, matching the final report format
impl fmt::Display for Latency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.9} s", self.total.as_secs_f64())
    }
}
