//! SQLite article sink
//!
//! This module provides the relational sink: an `articles` table with a
//! UNIQUE url column, written one transaction per article.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{ArticleSink, SinkError, SinkResult, WriteOutcome};
use crate::storage::{Article, EXTRACTION_MISS, FETCH_FAILED};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::path::Path;

const SINK_NAME: &str = "sqlite";

/// SQLite sink keyed by article URL
pub struct SqliteSink {
    conn: Connection,
}

impl SqliteSink {
    /// Opens (or creates) the database and ensures the `articles` table exists
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteSink)` - Database ready for writes
    /// * `Err(SinkError::Open)` - Database or table unavailable
    pub fn open(path: &Path) -> SinkResult<Self> {
        let open_err = |e: rusqlite::Error| SinkError::Open {
            sink: SINK_NAME,
            path: path.display().to_string(),
            reason: e.to_string(),
        };

        let conn = Connection::open(path).map_err(open_err)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )
        .map_err(open_err)?;

        initialize_schema(&conn).map_err(open_err)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn open_in_memory() -> SinkResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| SinkError::Open {
            sink: SINK_NAME,
            path: ":memory:".to_string(),
            reason: e.to_string(),
        })?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Upserts one article inside a transaction
    ///
    /// An existing row is overwritten in place, unless the incoming record is
    /// less complete (a failed or degraded record never replaces a better
    /// one). Either way the row count for the URL stays at one.
    fn upsert(&mut self, article: &Article) -> Result<WriteOutcome, rusqlite::Error> {
        let tx = self.conn.transaction()?;

        let existing: Option<Article> = tx
            .query_row(
                "SELECT title, sequence_id, published_at, url, body FROM articles WHERE url = ?1",
                params![article.url],
                article_from_row,
            )
            .optional()?;

        let outcome = match existing {
            None => {
                tx.execute(
                    "INSERT INTO articles (title, sequence_id, published_at, url, body)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        article.title,
                        article.sequence_id,
                        article.published_at,
                        article.url,
                        article.body
                    ],
                )?;
                WriteOutcome::Stored
            }
            Some(stored) => {
                if article.completeness() >= stored.completeness() {
                    tx.execute(
                        "UPDATE articles
                         SET title = ?1, sequence_id = ?2, published_at = ?3, body = ?4
                         WHERE url = ?5",
                        params![
                            article.title,
                            article.sequence_id,
                            article.published_at,
                            article.body,
                            article.url
                        ],
                    )?;
                }
                WriteOutcome::SkippedDuplicate
            }
        };

        tx.commit()?;
        Ok(outcome)
    }

    /// Total number of stored articles
    pub fn count_articles(&self) -> SinkResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM articles", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Articles recorded with an extraction-miss body
    pub fn count_degraded(&self) -> SinkResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM articles WHERE body = ?1 OR body IS NULL",
            params![EXTRACTION_MISS],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Articles recorded as fetch failures
    pub fn count_failed(&self) -> SinkResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM articles WHERE title = ?1 AND body = ?1",
            params![FETCH_FAILED],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Oldest and newest `published_at` among non-failed articles
    pub fn published_range(&self) -> SinkResult<Option<(String, String)>> {
        let range: (Option<String>, Option<String>) = self.conn.query_row(
            "SELECT MIN(published_at), MAX(published_at) FROM articles WHERE published_at != ?1",
            params![FETCH_FAILED],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(match range {
            (Some(oldest), Some(newest)) => Some((oldest, newest)),
            _ => None,
        })
    }

    /// Looks up an article by URL
    pub fn get_article(&self, url: &str) -> SinkResult<Option<Article>> {
        let article = self
            .conn
            .query_row(
                "SELECT title, sequence_id, published_at, url, body FROM articles WHERE url = ?1",
                params![url],
                article_from_row,
            )
            .optional()?;
        Ok(article)
    }
}

/// Maps a `title, sequence_id, published_at, url, body` row; a NULL body is an extraction miss
fn article_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Article> {
    Ok(Article {
        title: row.get(0)?,
        sequence_id: row.get(1)?,
        published_at: row.get(2)?,
        url: row.get(3)?,
        body: row
            .get::<_, Option<String>>(4)?
            .unwrap_or_else(|| EXTRACTION_MISS.to_string()),
    })
}

/// True for a store-raised UNIQUE violation
fn is_unique_violation(error: &rusqlite::Error) -> bool {
    matches!(
        error,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == ErrorCode::ConstraintViolation
                && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

impl ArticleSink for SqliteSink {
    fn name(&self) -> &'static str {
        SINK_NAME
    }

    fn write(&mut self, article: &Article) -> SinkResult<WriteOutcome> {
        match self.upsert(article) {
            Ok(WriteOutcome::Stored) => {
                tracing::info!("[{}] stored {}", SINK_NAME, article.url);
                Ok(WriteOutcome::Stored)
            }
            Ok(WriteOutcome::SkippedDuplicate) => {
                tracing::warn!("[{}] already stored, skipping {}", SINK_NAME, article.url);
                Ok(WriteOutcome::SkippedDuplicate)
            }
            Err(e) if is_unique_violation(&e) => {
                tracing::warn!("[{}] already stored, skipping {}", SINK_NAME, article.url);
                Ok(WriteOutcome::SkippedDuplicate)
            }
            Err(e) => {
                tracing::error!("[{}] write failed for {}: {}", SINK_NAME, article.url, e);
                Err(SinkError::Write {
                    sink: SINK_NAME,
                    url: article.url.clone(),
                    reason: e.to_string(),
                })
            }
        }
    }

    fn close(&mut self) -> SinkResult<()> {
        // Every write commits its own transaction; only the WAL needs folding back.
        self.conn
            .execute_batch("PRAGMA wal_checkpoint(PASSIVE);")
            .map_err(|e| SinkError::Close {
                sink: SINK_NAME,
                reason: e.to_string(),
            })
    }
}
