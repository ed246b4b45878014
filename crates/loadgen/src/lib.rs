//! Exponential-ramp synthetic traffic generation.
//!
//! This crate provides the pieces of a load generator that drives a target
//! endpoint at a steadily increasing request rate:
//! - Compute the target rate for any point in the run ([`schedule`])
//! - Generate random sessions and actions ([`session`])
//! - Execute and classify single interactions ([`executor`])
//! - Drive one-second ticks of concurrent batches ([`dispatch`])
//! - Record outcomes into a pluggable metrics sink ([`metrics`])
//!
//! HTTP and metrics exposition live outside this crate, behind the
//! [`Transport`] and [`MetricsSink`] traits.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod executor;
pub mod metrics;
pub mod schedule;
pub mod session;
pub mod summary;

pub use config::{LoadConfig, ScheduleParameters, DEFAULT_ACTIONS};
pub use dispatch::{DispatchLoop, LoopState, TICK_INTERVAL};
pub use error::{ConfigError, ConfigResult, TransportError};
pub use executor::{
    Interaction, InteractionPayload, InteractionRequest, Outcome, RequestExecutor, Transport,
    SESSION_HEADER,
};
pub use crate::metrics::{LatencySummary, MetricsSink, PrometheusSink, RecordingSink, SinkTotals};
pub use schedule::{batch_size, target_rate, Tick, MAX_BATCH_SIZE};
pub use session::{Session, SessionFactory, SESSION_ID_LEN};
pub use summary::RunSummary;
