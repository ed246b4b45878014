//! Exponential ramp schedule.
//!
//! The target rate is a continuous function of elapsed time:
//!
//! ```text
//! rate(t) = base_rps * ramp_factor ^ (t / max(1, ramp_interval_secs))
//! ```
//!
//! With `ramp_factor > 1` the rate doubles every
//! `ramp_interval_secs * ln(2) / ln(ramp_factor)` seconds.

use std::time::Duration;

use serde::Serialize;

use crate::config::ScheduleParameters;

/// Target requests per second after `elapsed_secs` of the run.
///
/// Pure and deterministic: identical inputs give bit-identical output.
pub fn target_rate(elapsed_secs: f64, params: &ScheduleParameters) -> f64 {
    let exponent = elapsed_secs / params.ramp_interval_secs.max(1.0);
    params.base_rps * params.ramp_factor.powf(exponent)
}

/// Upper bound on a single tick's batch.
///
/// Rates whose batch would exceed this, including an overflowed `+inf`
/// rate, dispatch exactly this many requests per tick.
pub const MAX_BATCH_SIZE: usize = 100_000;

/// Number of requests to dispatch for one tick.
///
/// Rounded to the nearest integer (ties to even), floored at 1 so the loop
/// always does work even when the target rate is far below one per
/// interval, and capped at [`MAX_BATCH_SIZE`].
pub fn batch_size(target_rps: f64, interval: Duration) -> usize {
    let requests = (target_rps * interval.as_secs_f64()).round_ties_even();
    if requests.is_nan() || requests < 1.0 {
        1
    } else if requests >= MAX_BATCH_SIZE as f64 {
        MAX_BATCH_SIZE
    } else {
        requests as usize
    }
}

/// One scheduling interval of the dispatch loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Tick {
    /// Zero-based tick number
    pub index: u64,
    pub elapsed_secs: f64,
    pub target_rps: f64,
    pub batch_size: usize,
}

impl Tick {
    pub fn compute(
        index: u64,
        elapsed_secs: f64,
        params: &ScheduleParameters,
        interval: Duration,
    ) -> Self {
        let target_rps = target_rate(elapsed_secs, params);
        Self {
            index,
            elapsed_secs,
            target_rps,
            batch_size: batch_size(target_rps, interval),
        }
    }
}
