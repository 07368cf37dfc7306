//! Storage module for persisting harvested articles
//!
//! This module handles every write of an article, including:
//! - The `Article` record shared by all sinks
//! - An append-only CSV sink that deduplicates against the file itself
//! - A SQLite sink that upserts by URL inside a transaction
//!
//! Both sinks are keyed by the article URL and treat a repeated URL as a
//! duplicate, never as an error, within a run and across runs.

mod csv_sink;
mod schema;
mod sqlite;
mod traits;

pub use csv_sink::{CsvSink, CSV_HEADER};
pub use sqlite::SqliteSink;
pub use traits::{ArticleSink, SinkError, SinkResult, WriteOutcome};

use crate::config::OutputConfig;
use std::path::Path;

/// Body value recorded when the page loaded but no body text was found
pub const EXTRACTION_MISS: &str = "-";

/// Value of every field except `url` when an item could not be fetched
pub const FETCH_FAILED: &str = "Error";

/// A harvested article, the unit of work and of persistence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub title: String,
    /// `"{page}-{index}"` on the listing, for human ordering only
    pub sequence_id: String,
    /// `YYYYMMDDhhmm`
    pub published_at: String,
    /// Natural key
    pub url: String,
    /// Extracted text, or `EXTRACTION_MISS`
    pub body: String,
}

impl Article {
    /// The record written for an item whose fetches were exhausted
    pub fn failed(url: impl Into<String>) -> Self {
        Self {
            title: FETCH_FAILED.to_string(),
            sequence_id: FETCH_FAILED.to_string(),
            published_at: FETCH_FAILED.to_string(),
            url: url.into(),
            body: FETCH_FAILED.to_string(),
        }
    }

    /// True for the all-sentinel record of a terminal fetch failure
    pub fn is_failed(&self) -> bool {
        self.title == FETCH_FAILED
            && self.sequence_id == FETCH_FAILED
            && self.published_at == FETCH_FAILED
            && self.body == FETCH_FAILED
    }

    /// True when the item was fetched but its body could not be extracted
    pub fn is_degraded(&self) -> bool {
        self.body == EXTRACTION_MISS
    }

    /// Ranks record completeness: failed < degraded < complete
    pub(crate) fn completeness(&self) -> u8 {
        if self.is_failed() {
            0
        } else if self.is_degraded() {
            1
        } else {
            2
        }
    }
}

/// Opens every sink the output configuration enables
///
/// A missing path disables that sink; zero, one or both may be returned.
/// Any sink that fails to open fails the whole call.
pub fn open_sinks(output: &OutputConfig) -> SinkResult<Vec<Box<dyn ArticleSink>>> {
    let mut sinks: Vec<Box<dyn ArticleSink>> = Vec::new();

    if let Some(path) = &output.csv_path {
        sinks.push(Box::new(CsvSink::open(Path::new(path))?));
        tracing::info!("CSV sink: {}", path);
    }

    if let Some(path) = &output.database_path {
        sinks.push(Box::new(SqliteSink::open(Path::new(path))?));
        tracing::info!("SQLite sink: {}", path);
    }

    Ok(sinks)
}
