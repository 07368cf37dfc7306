//! Slack incoming-webhook channel

use super::{Notifier, NotifyError};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Serialize)]
struct SlackMessage<'a> {
    text: &'a str,
}

/// Posts messages to a Slack incoming webhook
pub struct SlackNotifier {
    client: Client,
    webhook_url: String,
}

impl SlackNotifier {
    /// Creates a notifier for `webhook_url`
    ///
    /// # Returns
    ///
    /// * `Ok(SlackNotifier)` - Ready to post
    /// * `Err(NotifyError::InvalidConfig)` - The URL is not http(s)
    /// * `Err(NotifyError::Http)` - The HTTP client could not be built
    pub fn new(webhook_url: impl Into<String>) -> Result<Self, NotifyError> {
        let webhook_url = webhook_url.into();
        if !webhook_url.starts_with("http://") && !webhook_url.starts_with("https://") {
            return Err(NotifyError::InvalidConfig(
                "Webhook URL must start with http:// or https://".to_string(),
            ));
        }

        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self {
            client,
            webhook_url,
        })
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    fn name(&self) -> &str {
        "slack"
    }

    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&SlackMessage { text })
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(NotifyError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}
