//! Run notifications
//!
//! Delivery is fire-and-forget: a notification that cannot be sent is logged
//! and never affects the outcome of a run.

mod slack;

pub use slack::SlackNotifier;

use async_trait::async_trait;
use thiserror::Error;

/// Errors a notification channel can report
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Channel rejected message with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Invalid channel configuration: {0}")]
    InvalidConfig(String),
}

/// A channel that accepts plain-text messages
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Channel name used in logs
    fn name(&self) -> &str;

    /// Posts `text` to the channel
    async fn send(&self, text: &str) -> Result<(), NotifyError>;
}

/// Sends `text` and swallows any failure after logging it
pub async fn notify(notifier: &dyn Notifier, text: &str) {
    match notifier.send(text).await {
        Ok(()) => tracing::info!("Notification sent via {}", notifier.name()),
        Err(e) => tracing::warn!("Notification via {} failed: {}", notifier.name(), e),
    }
}
