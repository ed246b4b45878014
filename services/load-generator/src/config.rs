//! Command line and environment configuration.

use std::time::Duration;

use clap::{Parser, ValueEnum};
use loadgen::config::parse_actions;
use loadgen::{ConfigError, ConfigResult, LoadConfig, ScheduleParameters};

#[derive(Parser, Debug, Clone)]
#[command(name = "load-generator")]
#[command(about = "Drive a target endpoint at an exponentially ramping request rate")]
pub struct Args {
    /// URL receiving interaction requests
    #[arg(long, env = "TARGET_URL")]
    pub target_url: Option<String>,

    /// Comma separated action identifiers
    #[arg(long, env = "ACTIONS")]
    pub actions: Option<String>,

    /// Requests per second at the start of the run
    #[arg(long, env = "BASE_RPS", default_value_t = 2.0)]
    pub base_rps: f64,

    /// Rate multiplier applied per ramp interval
    #[arg(long, env = "RAMP_FACTOR", default_value_t = 1.35)]
    pub ramp_factor: f64,

    /// Time constant of the ramp in seconds
    #[arg(long, env = "RAMP_INTERVAL_SECONDS", default_value_t = 60.0)]
    pub ramp_interval_seconds: f64,

    /// Total run length in seconds
    #[arg(long, env = "RUN_DURATION_SECONDS", default_value_t = 300.0)]
    pub run_duration_seconds: f64,

    /// Port for the Prometheus scrape endpoint
    #[arg(long, env = "METRICS_PORT", default_value_t = 2112)]
    pub metrics_port: u16,

    /// Disable the Prometheus scrape endpoint
    #[arg(long)]
    pub no_metrics_server: bool,

    /// Total timeout for one request in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECONDS", default_value_t = 10.0)]
    pub request_timeout_seconds: f64,

    /// Connect timeout in seconds
    #[arg(long, env = "CONNECT_TIMEOUT_SECONDS", default_value_t = 5.0)]
    pub connect_timeout_seconds: f64,

    /// RNG seed for reproducible sessions
    #[arg(long, env = "LOAD_SEED")]
    pub seed: Option<u64>,

    /// Summary output format
    #[arg(short, long, env = "OUTPUT_FORMAT", value_enum, default_value_t = OutputFormat::Json)]
    pub output: OutputFormat,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log line format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Json)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Json,
    Pretty,
}

/// Timeouts for the HTTP transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportSettings {
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Args {
    /// Build and validate the run configuration.
    pub fn load_config(&self) -> ConfigResult<LoadConfig> {
        let target_url = match self.target_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => url.to_string(),
            _ => return Err(ConfigError::MissingTarget),
        };
        reqwest::Url::parse(&target_url)
            .map_err(|e| ConfigError::invalid("target_url", e.to_string()))?;

        let config = LoadConfig {
            target_url,
            actions: parse_actions(self.actions.as_deref())?,
            schedule: ScheduleParameters {
                base_rps: self.base_rps,
                ramp_factor: self.ramp_factor,
                ramp_interval_secs: self.ramp_interval_seconds,
                run_duration_secs: self.run_duration_seconds,
            },
            seed: self.seed,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn transport_settings(&self) -> ConfigResult<TransportSettings> {
        Ok(TransportSettings {
            request_timeout: seconds("request_timeout_seconds", self.request_timeout_seconds)?,
            connect_timeout: seconds("connect_timeout_seconds", self.connect_timeout_seconds)?,
        })
    }
}

fn seconds(param: &str, value: f64) -> ConfigResult<Duration> {
    if value <= 0.0 {
        return Err(ConfigError::invalid(param, format!("must be > 0, got {}", value)));
    }
    Duration::try_from_secs_f64(value).map_err(|e| ConfigError::invalid(param, e.to_string()))
}
