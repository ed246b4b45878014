//! Load generator entry point.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use load_generator::config::{Args, OutputFormat};
use load_generator::{telemetry, ReqwestTransport, SummaryReport};
use loadgen::{DispatchLoop, MetricsSink, PrometheusSink, RecordingSink, RequestExecutor, SessionFactory};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    telemetry::init_tracing(&args.log_level, args.log_format)?;

    // Configuration problems abort before anything is dispatched
    let config = args.load_config()?;
    let transport_settings = args.transport_settings()?;
    let sessions = SessionFactory::seeded(config.actions.clone(), config.seed)?;

    let sink: Arc<dyn MetricsSink> = if args.no_metrics_server {
        Arc::new(RecordingSink::new())
    } else {
        let addr = telemetry::install_prometheus(args.metrics_port)?;
        info!(%addr, "Prometheus metrics exporter listening");
        Arc::new(PrometheusSink::new())
    };

    info!(
        target_url = %config.target_url,
        actions = ?config.actions,
        base_rps = config.schedule.base_rps,
        ramp_factor = config.schedule.ramp_factor,
        ramp_interval_secs = config.schedule.ramp_interval_secs,
        run_duration_secs = config.schedule.run_duration_secs,
        "Launching load generator"
    );

    let transport = Arc::new(ReqwestTransport::new(transport_settings)?);
    let executor = RequestExecutor::new(config.target_url.as_str(), transport, sink);
    let mut dispatch = DispatchLoop::new(config.schedule(), executor, sessions)?;

    let summary = dispatch.run().await;
    if !summary.accounts_for_all_dispatched() {
        warn!(
            dispatched = summary.dispatched,
            total_requests = summary.total_requests,
            errors = summary.errors,
            "Some interactions were not counted"
        );
    }

    match args.output {
        OutputFormat::Json => println!("{}", SummaryReport::format_json(&summary)?),
        OutputFormat::Table => println!("{}", SummaryReport::format_table(&summary)),
    }

    Ok(())
}
