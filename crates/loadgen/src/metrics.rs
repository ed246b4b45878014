//! Metrics sinks for interaction outcomes.
//!
//! The dispatch loop and executor only see the [`MetricsSink`] trait. Two
//! implementations are provided:
//! - [`RecordingSink`]: in-process atomic counters and a latency histogram
//! - [`PrometheusSink`]: forwards to the `metrics` facade for scraping and
//!   keeps a [`RecordingSink`] for the end-of-run summary

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use hdrhistogram::Histogram;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};
use serde::{Deserialize, Serialize};

pub const REQUESTS_TOTAL: &str = "lg_sent_requests_total";
pub const ERRORS_TOTAL: &str = "lg_errors_total";
pub const REQUEST_DURATION: &str = "lg_request_duration_seconds";
pub const CURRENT_RATE: &str = "lg_current_rps";
pub const ACHIEVED_RATE: &str = "lg_achieved_rps";

/// Buckets for the request duration histogram, in seconds.
pub const DURATION_BUCKETS: [f64; 14] = [
    0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.25, 0.5, 0.75, 1.0, 2.5, 5.0, 7.5, 10.0,
];

/// Capability for recording interaction outcomes.
///
/// Implementations are shared across every request of a tick and must not
/// lose concurrent updates.
pub trait MetricsSink: Send + Sync {
    fn record_success(&self);

    fn record_error(&self);

    /// Only called when a response was received.
    fn observe_duration(&self, latency: Duration);

    fn set_target_rate(&self, rps: f64);

    fn set_achieved_rate(&self, _rps: f64) {}

    /// Counter values so far.
    fn totals(&self) -> SinkTotals;

    fn latency_summary(&self) -> Option<LatencySummary> {
        None
    }
}

/// Snapshot of sink counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkTotals {
    pub successes: u64,
    pub errors: u64,
    /// Latency observations recorded
    pub observations: u64,
}

/// Latency percentiles in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatencySummary {
    pub p50_ms: f64,
    pub p90_ms: f64,
    pub p99_ms: f64,
    pub max_ms: f64,
    pub mean_ms: f64,
}

/// In-process sink backed by atomics and an HDR histogram.
pub struct RecordingSink {
    successes: AtomicU64,
    errors: AtomicU64,
    observations: AtomicU64,
    target_rate_bits: AtomicU64,
    achieved_rate_bits: AtomicU64,
    histogram: Mutex<Histogram<u64>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self {
            successes: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            observations: AtomicU64::new(0),
            target_rate_bits: AtomicU64::new(0f64.to_bits()),
            achieved_rate_bits: AtomicU64::new(0f64.to_bits()),
            histogram: Mutex::new(Histogram::new(3).expect("Failed to create histogram")),
        }
    }

    /// Last published target rate.
    pub fn target_rate(&self) -> f64 {
        f64::from_bits(self.target_rate_bits.load(Ordering::Relaxed))
    }

    pub fn achieved_rate(&self) -> f64 {
        f64::from_bits(self.achieved_rate_bits.load(Ordering::Relaxed))
    }

    /// Recorded latencies in microseconds, as (value, count) pairs.
    pub fn latency_counts(&self) -> Vec<(u64, u64)> {
        let histogram = match self.histogram.lock() {
            Ok(h) => h,
            Err(poisoned) => poisoned.into_inner(),
        };
        histogram
            .iter_recorded()
            .map(|v| (v.value_iterated_to(), v.count_at_value()))
            .collect()
    }
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsSink for RecordingSink {
    fn record_success(&self) {
        self.successes.fetch_add(1, Ordering::Relaxed);
    }

    fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    fn observe_duration(&self, latency: Duration) {
        self.observations.fetch_add(1, Ordering::Relaxed);
        let mut histogram = match self.histogram.lock() {
            Ok(h) => h,
            Err(poisoned) => poisoned.into_inner(),
        };
        histogram.saturating_record(latency.as_micros() as u64);
    }

    fn set_target_rate(&self, rps: f64) {
        self.target_rate_bits.store(rps.to_bits(), Ordering::Relaxed);
    }

    fn set_achieved_rate(&self, rps: f64) {
        self.achieved_rate_bits.store(rps.to_bits(), Ordering::Relaxed);
    }

    fn totals(&self) -> SinkTotals {
        SinkTotals {
            successes: self.successes.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            observations: self.observations.load(Ordering::Relaxed),
        }
    }

    fn latency_summary(&self) -> Option<LatencySummary> {
        let histogram = match self.histogram.lock() {
            Ok(h) => h,
            Err(poisoned) => poisoned.into_inner(),
        };
        if histogram.is_empty() {
            return None;
        }

        Some(LatencySummary {
            p50_ms: histogram.value_at_percentile(50.0) as f64 / 1000.0,
            p90_ms: histogram.value_at_percentile(90.0) as f64 / 1000.0,
            p99_ms: histogram.value_at_percentile(99.0) as f64 / 1000.0,
            max_ms: histogram.max() as f64 / 1000.0,
            mean_ms: histogram.mean() / 1000.0,
        })
    }
}

/// Sink that publishes through the global `metrics` recorder.
///
/// Install a recorder (e.g. the Prometheus exporter) before recording;
/// without one the facade calls are no-ops and only the local totals move.
pub struct PrometheusSink {
    local: RecordingSink,
}

impl PrometheusSink {
    pub fn new() -> Self {
        describe_counter!(
            REQUESTS_TOTAL,
            Unit::Count,
            "Total number of requests sent by the load generator"
        );
        describe_counter!(ERRORS_TOTAL, Unit::Count, "Total number of failed requests");
        describe_histogram!(
            REQUEST_DURATION,
            Unit::Seconds,
            "Histogram of request durations"
        );
        describe_gauge!(CURRENT_RATE, "Current target requests per second");
        describe_gauge!(ACHIEVED_RATE, "Requests completed per second in the last tick");

        Self {
            local: RecordingSink::new(),
        }
    }
}

impl Default for PrometheusSink {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsSink for PrometheusSink {
    fn record_success(&self) {
        counter!(REQUESTS_TOTAL).increment(1);
        self.local.record_success();
    }

    fn record_error(&self) {
        counter!(ERRORS_TOTAL).increment(1);
        self.local.record_error();
    }

    fn observe_duration(&self, latency: Duration) {
        histogram!(REQUEST_DURATION).record(latency.as_secs_f64());
        self.local.observe_duration(latency);
    }

    fn set_target_rate(&self, rps: f64) {
        gauge!(CURRENT_RATE).set(rps);
        self.local.set_target_rate(rps);
    }

    fn set_achieved_rate(&self, rps: f64) {
        gauge!(ACHIEVED_RATE).set(rps);
        self.local.set_achieved_rate(rps);
    }

    fn totals(&self) -> SinkTotals {
        self.local.totals()
    }

    fn latency_summary(&self) -> Option<LatencySummary> {
        self.local.latency_summary()
    }
}
