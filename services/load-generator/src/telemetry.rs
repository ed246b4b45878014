//! Logging and metrics exporter setup.

use std::net::{Ipv4Addr, SocketAddr};

use anyhow::Result;
use loadgen::metrics::{DURATION_BUCKETS, REQUEST_DURATION};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use crate::config::LogFormat;

/// Map a level name onto a tracing level; unknown names fall back to info.
pub fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Install the global tracing subscriber.
pub fn init_tracing(level: &str, format: LogFormat) -> Result<()> {
    let builder = FmtSubscriber::builder()
        .with_max_level(parse_level(level))
        .with_target(true);

    match format {
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish())?,
        LogFormat::Pretty => tracing::subscriber::set_global_default(builder.finish())?,
    }
    Ok(())
}

/// Install the Prometheus recorder with a scrape listener on `port`.
///
/// Must be called from within a tokio runtime.
pub fn install_prometheus(port: u16) -> Result<SocketAddr> {
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(Matcher::Full(REQUEST_DURATION.to_string()), &DURATION_BUCKETS)?
        .install()?;

    Ok(addr)
}
