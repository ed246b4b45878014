//! Run summary formatting.

use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Table};
use loadgen::RunSummary;

/// Formats run summaries for output.
pub struct SummaryReport;

impl SummaryReport {
    /// Single-line JSON, one object per run.
    pub fn format_json(summary: &RunSummary) -> anyhow::Result<String> {
        Ok(serde_json::to_string(summary)?)
    }

    /// Format the summary as a console table.
    pub fn format_table(summary: &RunSummary) -> String {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_header(vec![format!("Load Generator Run: {}", summary.target)]);

        table.add_row(vec!["Started:", summary.started_at.as_str()]);
        table.add_row(vec!["Runtime:", &format!("{:.1}s", summary.runtime_seconds)]);
        table.add_row(vec!["Ticks:", &summary.ticks.to_string()]);
        table.add_row(vec!["Dispatched:", &summary.dispatched.to_string()]);
        table.add_row(vec!["Successful:", &summary.total_requests.to_string()]);
        table.add_row(vec!["Errors:", &summary.errors.to_string()]);
        table.add_row(vec!["Success Rate:", &format!("{:.1}%", summary.success_rate())]);

        if let Some(latency) = &summary.latency {
            table.add_row(vec!["", ""]);
            table.add_row(vec!["Latency (ms)", "p50 / p90 / p99 / max"]);
            table.add_row(vec![
                "",
                &format!(
                    "{:.1} / {:.1} / {:.1} / {:.1}",
                    latency.p50_ms, latency.p90_ms, latency.p99_ms, latency.max_ms
                ),
            ]);
        }

        table.to_string()
    }
}
