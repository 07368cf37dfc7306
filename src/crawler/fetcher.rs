//! Rendering fetcher
//!
//! Pages on the target site are assembled client-side, so every fetch goes
//! through a headless-browser service that returns the rendered markup once a
//! given element is present. This module handles:
//! - The `RenderingFetcher` seam the coordinator depends on
//! - A Browserless-compatible HTTP implementation
//! - Error classification into timeouts and navigation failures

use crate::config::RendererConfig;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Slack added on top of the page timeout before the HTTP request itself
/// is abandoned, so the renderer gets to report its own timeout first.
const REQUEST_GRACE: Duration = Duration::from_secs(5);

/// Errors a rendering fetch can end with
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Timed out rendering {url}")]
    Timeout { url: String },

    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("Snapshots are not supported by this renderer")]
    Unsupported,
}

/// Markup of a page after the wait selector appeared
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    /// URL the document was requested from
    pub url: String,
    pub html: String,
}

/// A headless-browser rendering service
#[async_trait]
pub trait RenderingFetcher: Send + Sync {
    /// Loads `url` and returns its markup once `wait_selector` matches
    ///
    /// Returns `FetchError::Timeout` when the element does not appear within
    /// `timeout`, and `FetchError::Navigation` for every other failure.
    async fn fetch(
        &self,
        url: &str,
        wait_selector: &str,
        timeout: Duration,
    ) -> Result<RenderedDocument, FetchError>;

    /// PNG screenshot of `url`, used for best-effort error snapshots
    async fn snapshot(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let _ = url;
        Err(FetchError::Unsupported)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ContentRequest<'a> {
    url: &'a str,
    wait_for_selector: WaitForSelector<'a>,
    goto_options: GotoOptions,
}

#[derive(Debug, Serialize)]
struct WaitForSelector<'a> {
    selector: &'a str,
    timeout: u64,
}

#[derive(Debug, Serialize)]
struct GotoOptions {
    timeout: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScreenshotRequest<'a> {
    url: &'a str,
    options: ScreenshotOptions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScreenshotOptions {
    full_page: bool,
    #[serde(rename = "type")]
    kind: &'static str,
}

/// Fetcher backed by a Browserless-style `/content` API
pub struct BrowserlessFetcher {
    client: Client,
    endpoint: String,
    token: Option<String>,
}

impl BrowserlessFetcher {
    /// Builds a fetcher for the configured rendering service
    ///
    /// # Arguments
    ///
    /// * `config` - Endpoint and optional access token
    ///
    /// # Returns
    ///
    /// * `Ok(BrowserlessFetcher)` - Ready to fetch
    /// * `Err(reqwest::Error)` - Failed to build the HTTP client
    pub fn new(config: &RendererConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            token: config
                .token
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(String::from),
        })
    }

    /// Builds a request to an API path; the token goes in the query, percent-encoded
    fn api_request(&self, path: &str) -> reqwest::RequestBuilder {
        let request = self.client.post(format!("{}/{}", self.endpoint, path));
        match &self.token {
            Some(token) => request.query(&[("token", token.as_str())]),
            None => request,
        }
    }

    /// Posts a JSON payload and returns the successful response
    async fn post<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        url: &str,
        timeout: Duration,
    ) -> Result<reqwest::Response, FetchError> {
        let response = self
            .api_request(path)
            .timeout(timeout + REQUEST_GRACE)
            .json(payload)
            .send()
            .await
            .map_err(|e| classify_transport_error(url, e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::REQUEST_TIMEOUT || status == StatusCode::GATEWAY_TIMEOUT {
            return Err(FetchError::Timeout {
                url: url.to_string(),
            });
        }

        let message = response.text().await.unwrap_or_default();
        Err(FetchError::Navigation {
            url: url.to_string(),
            reason: format!("renderer returned {}: {}", status.as_u16(), message.trim()),
        })
    }
}

fn classify_transport_error(url: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Navigation {
            url: url.to_string(),
            reason: error.to_string(),
        }
    }
}

#[async_trait]
impl RenderingFetcher for BrowserlessFetcher {
    async fn fetch(
        &self,
        url: &str,
        wait_selector: &str,
        timeout: Duration,
    ) -> Result<RenderedDocument, FetchError> {
        let timeout_ms = timeout.as_millis() as u64;
        let payload = ContentRequest {
            url,
            wait_for_selector: WaitForSelector {
                selector: wait_selector,
                timeout: timeout_ms,
            },
            goto_options: GotoOptions {
                timeout: timeout_ms,
            },
        };

        tracing::debug!("Rendering {} (waiting for '{}')", url, wait_selector);

        let response = self.post("content", &payload, url, timeout).await?;
        let html = response
            .text()
            .await
            .map_err(|e| classify_transport_error(url, e))?;

        Ok(RenderedDocument {
            url: url.to_string(),
            html,
        })
    }

    async fn snapshot(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let payload = ScreenshotRequest {
            url,
            options: ScreenshotOptions {
                full_page: true,
                kind: "png",
            },
        };

        let response = self
            .post("screenshot", &payload, url, Duration::from_secs(30))
            .await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| classify_transport_error(url, e))?;

        Ok(bytes.to_vec())
    }
}
