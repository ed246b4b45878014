//! Load generator service.
//!
//! Wires the `loadgen` dispatch loop to real infrastructure:
//! - Command line / environment configuration
//! - A pooled reqwest client as the transport
//! - Structured logging and a Prometheus scrape endpoint
//! - JSON or table output of the run summary

pub mod config;
pub mod report;
pub mod telemetry;
pub mod transport;

pub use config::Args;
pub use report::SummaryReport;
pub use transport::ReqwestTransport;
