//! Error types for the load generator.

use thiserror::Error;

/// Result type alias for configuration checks.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Missing or invalid configuration, detected before the dispatch loop starts.
///
/// This is the only error that escapes to the process boundary; every
/// per-request failure is absorbed into metrics instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("TARGET_URL is required")]
    MissingTarget,

    #[error("at least one action must be configured")]
    EmptyActions,

    #[error("Invalid parameter value for '{param}': {message}")]
    InvalidParameter { param: String, message: String },
}

impl ConfigError {
    pub fn invalid(param: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::InvalidParameter {
            param: param.into(),
            message: message.into(),
        }
    }
}

/// Connection-level failure of a single interaction.
///
/// No response was received, so no latency is recorded for it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Request timeout")]
    Timeout,

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Request failed: {0}")]
    Request(String),
}
