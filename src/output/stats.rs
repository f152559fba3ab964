//! Statistics for a fetch run
//!
//! Tracks what the driver loop observed: how many cycles succeeded or failed,
//! how much data came back, latency totals, and how far the rate moved.

use crate::FetchError;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Fetch run statistics summary
#[derive(Debug, Clone)]
pub struct FetchStatistics {
    /// When the run started
    pub started_at: DateTime<Utc>,

    /// When the run ended (None while running)
    pub finished_at: Option<DateTime<Utc>>,

    /// Number of completed fetch cycles (successes + failures)
    pub cycles: u64,

    /// Number of successful fetches
    pub successes: u64,

    /// Number of failed fetches
    pub failures: u64,

    /// Failure counts grouped by kind
    pub failures_by_kind: HashMap<&'static str, u64>,

    /// Payload bytes received across all successful fetches
    pub bytes_received: u64,

    /// Sum of latencies of successful fetches (milliseconds)
    pub total_latency_ms: u64,

    /// Slowest successful fetch (milliseconds)
    pub max_latency_ms: u64,

    /// Lowest rate observed during the run
    pub min_rate: f64,

    /// Highest rate observed during the run
    pub max_rate: f64,

    /// Rate after the most recent cycle
    pub final_rate: f64,
}

impl FetchStatistics {
    /// Starts a new run at `initial_rate`
    pub fn new(initial_rate: f64) -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            cycles: 0,
            successes: 0,
            failures: 0,
            failures_by_kind: HashMap::new(),
            bytes_received: 0,
            total_latency_ms: 0,
            max_latency_ms: 0,
            min_rate: initial_rate,
            max_rate: initial_rate,
            final_rate: initial_rate,
        }
    }

    /// Records a successful cycle and the rate it left behind
    pub fn record_success(&mut self, elapsed_ms: u64, bytes: u64, rate: f64) {
        self.cycles += 1;
        self.successes += 1;
        self.bytes_received += bytes;
        self.total_latency_ms = self.total_latency_ms.saturating_add(elapsed_ms);
        self.max_latency_ms = self.max_latency_ms.max(elapsed_ms);
        self.observe_rate(rate);
    }

    /// Records a failed cycle
    pub fn record_failure(&mut self, error: &FetchError, rate: f64) {
        self.cycles += 1;
        self.failures += 1;
        *self.failures_by_kind.entry(error.kind()).or_insert(0) += 1;
        self.observe_rate(rate);
    }

    fn observe_rate(&mut self, rate: f64) {
        self.min_rate = self.min_rate.min(rate);
        self.max_rate = self.max_rate.max(rate);
        self.final_rate = rate;
    }

    /// Marks the run as finished
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Mean latency of successful fetches
    pub fn average_latency_ms(&self) -> Option<f64> {
        if self.successes == 0 {
            None
        } else {
            Some(self.total_latency_ms as f64 / self.successes as f64)
        }
    }

    /// Percentage of cycles that succeeded
    pub fn success_rate(&self) -> f64 {
        if self.cycles == 0 {
            0.0
        } else {
            (self.successes as f64 / self.cycles as f64) * 100.0
        }
    }

    /// Wall-clock duration of the run, if finished
    pub fn duration_seconds(&self) -> Option<i64> {
        self.finished_at
            .map(|finished| (finished - self.started_at).num_seconds())
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &FetchStatistics) {
    println!("=== Fetch Statistics ===\n");

    println!("Overview:");
    println!("  Started: {}", stats.started_at.to_rfc3339());
    if let Some(seconds) = stats.duration_seconds() {
        println!("  Duration: {}s", seconds);
    }
    println!("  Cycles: {}", stats.cycles);
    println!("  Successful: {}", stats.successes);
    println!("  Failed: {}", stats.failures);
    println!("  Bytes received: {}", stats.bytes_received);
    println!();

    println!("Latency:");
    match stats.average_latency_ms() {
        Some(avg) => {
            println!("  Average: {:.1}ms", avg);
            println!("  Slowest: {}ms", stats.max_latency_ms);
        }
        None => println!("  No successful fetches"),
    }
    println!();

    println!("Rate (requests/sec):");
    println!("  Lowest: {:.3}", stats.min_rate);
    println!("  Highest: {:.3}", stats.max_rate);
    println!("  Final: {:.3}", stats.final_rate);
    println!();

    if !stats.failures_by_kind.is_empty() {
        println!("Error Summary:");
        let mut error_counts: Vec<_> = stats.failures_by_kind.iter().collect();
        error_counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

        for (kind, count) in error_counts {
            println!("  {}: {}", kind, count);
        }
        println!();
    }

    println!(
        "Success Rate: {:.1}% ({} / {} fetches)",
        stats.success_rate(),
        stats.successes,
        stats.cycles
    );
}
