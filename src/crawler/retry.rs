//! Bounded retry with resume points
//!
//! A failed fetch is re-issued for the same URL, waiting on the same element,
//! until the unit of work's budget is spent. The phase table in
//! `state::Phase` fixes both the wait selector and the parse step that takes
//! over on success, so recovery never restarts the item from scratch.

use crate::config::SelectorConfig;
use crate::crawler::fetcher::{FetchError, RenderedDocument, RenderingFetcher};
use crate::state::{CrawlCursor, Phase, Resume, RetryState};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// A successful fetch and the step that consumes it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Continuation {
    pub resume: Resume,
    pub document: RenderedDocument,
}

/// A fetch whose retry budget is exhausted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalFailure {
    pub url: String,
    pub phase: Phase,
    /// Failed attempts charged to the unit of work, including the last one
    pub attempts: u32,
    pub reason: FetchError,
}

/// Drives fetches through the retry budget
pub struct RetryController {
    selectors: SelectorConfig,
    max_retries: u32,
    timeout: Duration,
    snapshot_dir: Option<PathBuf>,
}

impl RetryController {
    pub fn new(selectors: SelectorConfig, max_retries: u32, timeout: Duration) -> Self {
        Self {
            selectors,
            max_retries,
            timeout,
            snapshot_dir: None,
        }
    }

    /// Enables best-effort screenshots into `dir`
    pub fn with_snapshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.snapshot_dir = Some(dir.into());
        self
    }

    /// Fetches `url` in `state.phase`, retrying until success or exhaustion
    ///
    /// Each retry re-issues the same URL with the phase's wait selector. The
    /// budget in `state` is not reset here, so the caller decides whether it
    /// spans one request or several hops of the same item.
    ///
    /// # Returns
    ///
    /// * `Ok(Continuation)` - The document and the parse step to resume at
    /// * `Err(TerminalFailure)` - Every allowed attempt failed
    pub async fn fetch(
        &self,
        fetcher: &dyn RenderingFetcher,
        url: &str,
        state: &mut RetryState,
        cursor: &CrawlCursor,
    ) -> Result<Continuation, TerminalFailure> {
        loop {
            let wait_selector = state.phase.wait_selector(&self.selectors);

            match fetcher.fetch(url, wait_selector, self.timeout).await {
                Ok(document) => {
                    return Ok(Continuation {
                        resume: state.phase.resume_at(),
                        document,
                    });
                }
                Err(error) if state.can_retry(self.max_retries) => {
                    state.record_failure();
                    tracing::warn!(
                        "[{}] {} failed ({}), retry {}/{}",
                        cursor.sequence_id(),
                        state.phase,
                        error,
                        state.attempt,
                        self.max_retries
                    );
                    let name = format!(
                        "error{}-{}-{}.png",
                        cursor.page_number, cursor.item_index, state.attempt
                    );
                    self.save_snapshot(fetcher, url, &name).await;
                }
                Err(error) => {
                    state.record_failure();
                    tracing::error!(
                        "[{}] {} gave up on {} after {} attempts: {}",
                        cursor.sequence_id(),
                        state.phase,
                        url,
                        state.attempt,
                        error
                    );
                    return Err(TerminalFailure {
                        url: url.to_string(),
                        phase: state.phase,
                        attempts: state.attempt,
                        reason: error,
                    });
                }
            }
        }
    }

    /// Screenshot of a listing page that loaded
    pub async fn snapshot_listing(
        &self,
        fetcher: &dyn RenderingFetcher,
        url: &str,
        page_number: u32,
    ) {
        self.save_snapshot(fetcher, url, &format!("page{}.png", page_number))
            .await;
    }

    /// Writes a screenshot if a snapshot directory is configured
    ///
    /// Never fails: every problem is logged and dropped.
    async fn save_snapshot(&self, fetcher: &dyn RenderingFetcher, url: &str, name: &str) {
        let Some(dir) = &self.snapshot_dir else {
            return;
        };

        let bytes = match fetcher.snapshot(url).await {
            Ok(bytes) => bytes,
            Err(FetchError::Unsupported) => {
                tracing::debug!("Renderer cannot take snapshots, skipping {}", name);
                return;
            }
            Err(e) => {
                tracing::warn!("Snapshot of {} failed: {}", url, e);
                return;
            }
        };

        if let Err(e) = write_snapshot(dir, name, &bytes).await {
            tracing::warn!("Could not save snapshot {}: {}", name, e);
        } else {
            tracing::debug!("Saved snapshot {}", name);
        }
    }
}

async fn write_snapshot(dir: &Path, name: &str, bytes: &[u8]) -> std::io::Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    tokio::fs::write(dir.join(name), bytes).await
}
