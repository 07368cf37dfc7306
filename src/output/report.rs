//! Human-readable run report
//!
//! The report is plain text so it reads the same in a terminal, a log file
//! and a chat message.

use crate::output::stats::RunStats;

/// Formats a run report
///
/// # Arguments
///
/// * `stats` - Counters of a finished run
///
/// # Returns
///
/// A multi-line report ending with a newline
pub fn format_report(stats: &RunStats) -> String {
    let mut report = String::new();

    report.push_str("=== Harvest Report ===\n");
    if let Some(started) = stats.started_at {
        report.push_str(&format!("Started: {}\n", started.format("%Y-%m-%d %H:%M:%S %:z")));
    }
    if let Some(seconds) = stats.duration_seconds() {
        report.push_str(&format!("Duration: {}s\n", seconds));
    }
    report.push('\n');

    match stats.total_advertised {
        Some(total) => report.push_str(&format!("Advertised on listing: {}\n", total)),
        None => report.push_str("Advertised on listing: unknown\n"),
    }
    report.push_str(&format!("Listing pages: {}\n", stats.pages));
    report.push_str(&format!("Fetched: {}\n", stats.fetched));
    report.push_str(&format!("Delivered: {}\n", stats.delivered));
    report.push_str(&format!("Persisted: {}\n", stats.persisted));
    report.push_str(&format!("Without body: {}\n", stats.degraded));
    report.push_str(&format!("Failed: {}\n", stats.failed));
    if stats.malformed > 0 {
        report.push_str(&format!("Skipped (no link): {}\n", stats.malformed));
    }

    if !stats.sinks.is_empty() {
        report.push_str("\nSinks:\n");
        for (name, counters) in &stats.sinks {
            report.push_str(&format!(
                "  {}: {} stored, {} duplicates skipped, {} errors\n",
                name, counters.stored, counters.duplicates, counters.errors
            ));
        }
    }

    push_list(&mut report, "Failed URLs", &stats.failed_urls);
    push_list(&mut report, "Articles without body", &stats.degraded_urls);
    push_list(&mut report, "Write errors", &stats.sink_errors);

    report
}

/// Message posted when a run completes
pub fn completion_notice(timestamp: &str, report: &str) -> String {
    format!("harvest finished: {}\n\n{}", timestamp, report)
}

fn push_list(report: &mut String, heading: &str, entries: &[String]) {
    if entries.is_empty() {
        return;
    }
    report.push_str(&format!("\n{} ({}):\n", heading, entries.len()));
    for entry in entries {
        report.push_str(&format!("  - {}\n", entry));
    }
}
