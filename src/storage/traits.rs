//! Sink trait and error types
//!
//! This module defines the interface every article sink implements and the
//! errors a sink can report.

use crate::storage::Article;
use thiserror::Error;

/// Errors that can occur in a sink
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Failed to open {sink} sink at {path}: {reason}")]
    Open {
        sink: &'static str,
        path: String,
        reason: String,
    },

    #[error("Failed to write {url} to {sink} sink: {reason}")]
    Write {
        sink: &'static str,
        url: String,
        reason: String,
    },

    #[error("Failed to close {sink} sink: {reason}")]
    Close { sink: &'static str, reason: String },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for sink operations
pub type SinkResult<T> = Result<T, SinkError>;

/// What a sink did with an article
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// A new record was written for this URL
    Stored,

    /// A record for this URL already existed; no second record was created
    SkippedDuplicate,
}

/// A destination for harvested articles, keyed by article URL
///
/// Opening is done by each sink's constructor; a sink that cannot open
/// aborts the run before any page is fetched. A sink owns its handle
/// exclusively for the duration of a run.
pub trait ArticleSink: Send {
    /// Short name used in logs and per-sink counters
    fn name(&self) -> &'static str;

    /// Writes an article unless its URL is already present
    ///
    /// A repeated URL yields `WriteOutcome::SkippedDuplicate`, never an error
    /// and never a second record. Any other failure leaves the sink unchanged
    /// and is returned as `SinkError::Write`.
    fn write(&mut self, article: &Article) -> SinkResult<WriteOutcome>;

    /// Flushes and commits everything written so far
    fn close(&mut self) -> SinkResult<()>;
}
