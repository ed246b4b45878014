//! Run configuration and validation.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Actions used when none are configured.
pub const DEFAULT_ACTIONS: [&str; 3] = ["book_ticket", "cancel_ticket", "give_feedback"];

/// Parameters of the exponential ramp. Fixed for the lifetime of a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScheduleParameters {
    /// Requests per second at elapsed = 0.
    pub base_rps: f64,
    /// Multiplicative growth per ramp interval.
    pub ramp_factor: f64,
    /// Time constant of the ramp, in seconds.
    pub ramp_interval_secs: f64,
    /// Total run length, in seconds.
    pub run_duration_secs: f64,
}

impl Default for ScheduleParameters {
    fn default() -> Self {
        Self {
            base_rps: 2.0,
            ramp_factor: 1.35,
            ramp_interval_secs: 60.0,
            run_duration_secs: 300.0,
        }
    }
}

impl ScheduleParameters {
    /// Validate that every parameter is finite and strictly positive.
    pub fn validate(&self) -> ConfigResult<()> {
        check_positive("base_rps", self.base_rps)?;
        check_positive("ramp_factor", self.ramp_factor)?;
        check_positive("ramp_interval_secs", self.ramp_interval_secs)?;
        check_positive("run_duration_secs", self.run_duration_secs)?;
        Ok(())
    }
}

fn check_positive(param: &str, value: f64) -> ConfigResult<()> {
    if !value.is_finite() {
        return Err(ConfigError::invalid(param, format!("{} is not a finite number", value)));
    }
    if value <= 0.0 {
        return Err(ConfigError::invalid(param, format!("must be > 0, got {}", value)));
    }
    Ok(())
}

/// Complete load generator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    pub target_url: String,
    pub actions: Vec<String>,
    #[serde(flatten)]
    pub schedule: ScheduleParameters,
    /// Optional RNG seed for reproducible sessions
    #[serde(default)]
    pub seed: Option<u64>,
}

impl LoadConfig {
    /// Build a configuration with the default actions and ramp.
    pub fn new(target_url: impl Into<String>) -> Self {
        Self {
            target_url: target_url.into(),
            actions: DEFAULT_ACTIONS.iter().map(|a| a.to_string()).collect(),
            schedule: ScheduleParameters::default(),
            seed: None,
        }
    }

    /// Validate configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.target_url.trim().is_empty() {
            return Err(ConfigError::MissingTarget);
        }
        if self.actions.is_empty() {
            return Err(ConfigError::EmptyActions);
        }
        self.schedule.validate()
    }

    pub fn schedule(&self) -> ScheduleParameters {
        self.schedule
    }
}

/// Parse a comma separated action list.
///
/// Entries are trimmed and blanks dropped. `None` yields the default actions;
/// an explicit list with no usable entries is rejected.
pub fn parse_actions(raw: Option<&str>) -> ConfigResult<Vec<String>> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_ACTIONS.iter().map(|a| a.to_string()).collect());
    };

    let actions: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    if actions.is_empty() {
        return Err(ConfigError::EmptyActions);
    }
    Ok(actions)
}
