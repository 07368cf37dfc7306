//! Append-only CSV sink
//!
//! The file itself is the source of truth for deduplication: the URLs
//! already present are read back when the sink opens, so re-running over the
//! same listing never appends a second row for a URL.

use crate::storage::traits::{ArticleSink, SinkError, SinkResult, WriteOutcome};
use crate::storage::Article;
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

const SINK_NAME: &str = "csv";

/// Column names, in write order
pub const CSV_HEADER: [&str; 5] = ["title", "sequenceId", "publishedAt", "url", "body"];

const URL_COLUMN: usize = 3;

/// CSV sink writing one row per article URL
///
/// Rows are encoded in memory and written to the file in one call, so nothing
/// stays buffered after a write returns; a failed write is never emitted
/// later by a subsequent write or by `close`.
pub struct CsvSink {
    file: File,
    seen: HashSet<String>,
}

impl CsvSink {
    /// Opens `path` for appending, creating it with a header row if needed
    pub fn open(path: &Path) -> SinkResult<Self> {
        let open_err = |reason: String| SinkError::Open {
            sink: SINK_NAME,
            path: path.display().to_string(),
            reason,
        };

        let seen = if path.exists() {
            read_seen_urls(path).map_err(|e| open_err(e.to_string()))?
        } else {
            HashSet::new()
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| open_err(e.to_string()))?;
        let is_empty = file
            .metadata()
            .map_err(|e| open_err(e.to_string()))?
            .len()
            == 0;

        if is_empty {
            let header = encode_record(&CSV_HEADER).map_err(|e| open_err(e.to_string()))?;
            file.write_all(&header)
                .map_err(|e| open_err(e.to_string()))?;
        }

        tracing::debug!(
            "[{}] opened {} with {} known URLs",
            SINK_NAME,
            path.display(),
            seen.len()
        );

        Ok(Self { file, seen })
    }
}

/// Reads the url column of every data row
fn read_seen_urls(path: &Path) -> Result<HashSet<String>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let mut seen = HashSet::new();
    for record in reader.records() {
        let record = record?;
        if let Some(url) = record.get(URL_COLUMN) {
            if !url.is_empty() {
                seen.insert(url.to_string());
            }
        }
    }
    Ok(seen)
}

/// Encodes one quoted CSV row, line terminator included
fn encode_record(fields: &[&str]) -> Result<Vec<u8>, csv::Error> {
    let mut buf = Vec::new();
    {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(&mut buf);
        writer.write_record(fields)?;
        writer.flush()?;
    }
    Ok(buf)
}

impl ArticleSink for CsvSink {
    fn name(&self) -> &'static str {
        SINK_NAME
    }

    fn write(&mut self, article: &Article) -> SinkResult<WriteOutcome> {
        if self.seen.contains(&article.url) {
            tracing::warn!("[{}] already stored, skipping {}", SINK_NAME, article.url);
            return Ok(WriteOutcome::SkippedDuplicate);
        }

        let record = [
            article.title.as_str(),
            article.sequence_id.as_str(),
            article.published_at.as_str(),
            article.url.as_str(),
            article.body.as_str(),
        ];

        let write_err = |reason: String| SinkError::Write {
            sink: SINK_NAME,
            url: article.url.clone(),
            reason,
        };

        let row = encode_record(&record).map_err(|e| write_err(e.to_string()))?;
        self.file
            .write_all(&row)
            .map_err(|e| write_err(e.to_string()))?;

        self.seen.insert(article.url.clone());
        tracing::info!("[{}] stored {}", SINK_NAME, article.url);
        Ok(WriteOutcome::Stored)
    }

    fn close(&mut self) -> SinkResult<()> {
        self.file.sync_data().map_err(|e| SinkError::Close {
            sink: SINK_NAME,
            reason: e.to_string(),
        })
    }
}
