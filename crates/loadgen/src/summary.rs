//! End-of-run summary.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::metrics::{LatencySummary, SinkTotals};

/// Aggregated result of a run, assembled from sink counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub target: String,
    /// Successful interactions
    pub total_requests: u64,
    pub errors: u64,
    /// Wall clock from start until the last batch drained
    pub runtime_seconds: f64,
    pub ticks: u64,
    pub dispatched: u64,
    pub started_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency: Option<LatencySummary>,
}

impl RunSummary {
    pub fn new(
        target: impl Into<String>,
        totals: SinkTotals,
        latency: Option<LatencySummary>,
        ticks: u64,
        dispatched: u64,
        runtime: Duration,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            target: target.into(),
            total_requests: totals.successes,
            errors: totals.errors,
            runtime_seconds: runtime.as_secs_f64(),
            ticks,
            dispatched,
            started_at: started_at.to_rfc3339(),
            latency,
        }
    }

    /// Every dispatched interaction was counted as a success or an error.
    pub fn accounts_for_all_dispatched(&self) -> bool {
        self.total_requests + self.errors >= self.dispatched
    }

    /// Successful share of counted interactions, in percent.
    pub fn success_rate(&self) -> f64 {
        let counted = self.total_requests + self.errors;
        if counted == 0 {
            0.0
        } else {
            self.total_requests as f64 / counted as f64 * 100.0
        }
    }
}
