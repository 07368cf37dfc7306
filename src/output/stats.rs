//! Run counters and archive statistics
//!
//! `RunStats` is owned by the coordinator for one run and handed back when
//! the run finishes. `ArchiveStatistics` is read from the SQLite database and
//! describes everything harvested so far, across runs.

use crate::storage::{SinkError, SqliteSink, WriteOutcome};
use crate::HarvestError;
use chrono::{DateTime, FixedOffset};
use std::collections::BTreeMap;

/// What one sink did during a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkCounters {
    pub stored: u64,
    pub duplicates: u64,
    pub errors: u64,
}

/// Counters for a single harvest run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Item count the first listing page advertised
    pub total_advertised: Option<u64>,

    /// Items dispatched to a detail fetch
    pub fetched: u64,

    /// Items persisted with a body
    pub delivered: u64,

    /// Items stored by at least one sink
    pub persisted: u64,

    /// Items whose page loaded but had no extractable body
    pub degraded: u64,

    /// Items and listing pages whose retries were exhausted
    pub failed: u64,

    /// Listing entries skipped because they carried no link
    pub malformed: u64,

    /// Listing pages loaded
    pub pages: u64,

    /// Per-sink outcomes, keyed by sink name
    pub sinks: BTreeMap<String, SinkCounters>,

    pub failed_urls: Vec<String>,
    pub degraded_urls: Vec<String>,

    /// One line per rejected write
    pub sink_errors: Vec<String>,

    pub started_at: Option<DateTime<FixedOffset>>,
    pub finished_at: Option<DateTime<FixedOffset>>,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a sink so it shows up in the report even if nothing was written
    pub fn register_sink(&mut self, name: &str) {
        self.sinks.entry(name.to_string()).or_default();
    }

    /// Records one sink's answer to a write
    pub fn record_write(&mut self, sink: &str, url: &str, result: &Result<WriteOutcome, SinkError>) {
        let counters = self.sinks.entry(sink.to_string()).or_default();
        match result {
            Ok(WriteOutcome::Stored) => counters.stored += 1,
            Ok(WriteOutcome::SkippedDuplicate) => counters.duplicates += 1,
            Err(e) => {
                counters.errors += 1;
                self.sink_errors.push(format!("{} {}: {}", sink, url, e));
            }
        }
    }

    pub fn record_delivered(&mut self) {
        self.delivered += 1;
    }

    pub fn record_degraded(&mut self, url: &str) {
        self.degraded += 1;
        self.degraded_urls.push(url.to_string());
    }

    /// Counts a terminal failure; the URL is listed once however often it fails
    pub fn record_failed(&mut self, url: &str) {
        self.failed += 1;
        if !self.failed_urls.iter().any(|u| u == url) {
            self.failed_urls.push(url.to_string());
        }
    }

    /// Run duration in whole seconds, once both ends are known
    pub fn duration_seconds(&self) -> Option<i64> {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => Some((end - start).num_seconds()),
            _ => None,
        }
    }

    /// Total duplicates skipped across all sinks
    pub fn duplicates(&self) -> u64 {
        self.sinks.values().map(|c| c.duplicates).sum()
    }
}

/// Statistics of the SQLite archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveStatistics {
    pub total_articles: u64,
    pub complete: u64,
    pub degraded: u64,
    pub failed: u64,
    /// Oldest and newest `published_at`
    pub published_range: Option<(String, String)>,
}

/// Loads statistics from the database
///
/// # Arguments
///
/// * `sink` - An open SQLite sink
///
/// # Returns
///
/// * `Ok(ArchiveStatistics)` - Successfully loaded statistics
/// * `Err(HarvestError)` - Failed to query statistics
pub fn load_statistics(sink: &SqliteSink) -> Result<ArchiveStatistics, HarvestError> {
    let total_articles = sink.count_articles()?;
    let degraded = sink.count_degraded()?;
    let failed = sink.count_failed()?;
    let published_range = sink.published_range()?;

    Ok(ArchiveStatistics {
        total_articles,
        complete: total_articles.saturating_sub(degraded + failed),
        degraded,
        failed,
        published_range,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &ArchiveStatistics) {
    println!("=== Archive Statistics ===\n");

    println!("Articles:");
    println!("  Total: {}", stats.total_articles);
    println!("  Complete: {}", stats.complete);
    println!("  Without body: {}", stats.degraded);
    println!("  Fetch failed: {}", stats.failed);
    println!();

    if let Some((oldest, newest)) = &stats.published_range {
        println!("Published between {} and {}", oldest, newest);
        println!();
    }

    let rate = if stats.total_articles > 0 {
        (stats.complete as f64 / stats.total_articles as f64) * 100.0
    } else {
        0.0
    };
    println!(
        "Completeness: {:.1}% ({} / {} articles with a body)",
        rate, stats.complete, stats.total_articles
    );
}
