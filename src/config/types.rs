use serde::Deserialize;

/// Main configuration structure for newsharvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub site: SiteConfig,
    pub selectors: SelectorConfig,
    pub crawler: CrawlerConfig,
    pub renderer: RendererConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
}

/// The site being harvested
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// First listing page
    #[serde(rename = "listing-url")]
    pub listing_url: String,

    /// Base for resolving relative next-page and article links
    #[serde(rename = "base-url")]
    pub base_url: String,
}

/// CSS selectors locating each piece of the listing and detail pages
#[derive(Debug, Clone, Deserialize)]
pub struct SelectorConfig {
    /// Container the renderer waits for on a listing page
    #[serde(rename = "listing-container")]
    pub listing_container: String,

    /// One element per listed item
    pub item: String,

    /// Item title, relative to the item element
    pub title: String,

    /// Item date ("M/D(weekday) hh:mm"), relative to the item element
    pub date: String,

    /// Element carrying the item's `href`, relative to the item element
    pub link: String,

    /// Element holding the advertised item total (e.g. "123件")
    #[serde(rename = "total-count")]
    pub total_count: String,

    /// Element carrying the next listing page `href`
    #[serde(rename = "next-page")]
    pub next_page: String,

    /// Container the renderer waits for on detail pages
    #[serde(rename = "article-container")]
    pub article_container: String,

    /// Link from a headline page to the full article
    #[serde(rename = "full-article-link")]
    pub full_article_link: String,

    /// Body text on a headline page without a full-article link
    #[serde(rename = "headline-content")]
    pub headline_content: String,

    /// Body text on the full article page
    #[serde(rename = "article-content")]
    pub article_content: String,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Per-fetch timeout handed to the renderer (milliseconds)
    #[serde(rename = "timeout-ms", default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Retries per item (or listing page) before it is recorded as failed
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Stop at the first item not published today (Asia/Tokyo)
    #[serde(rename = "restrict-to-today", default)]
    pub restrict_to_today: bool,

    /// Pause after each dispatched item (milliseconds)
    #[serde(rename = "inter-item-delay-ms", default = "default_inter_item_delay_ms")]
    pub inter_item_delay_ms: u64,
}

fn default_timeout_ms() -> u64 {
    90_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_inter_item_delay_ms() -> u64 {
    10_000
}

/// Headless rendering service (Browserless-compatible HTTP API)
#[derive(Debug, Clone, Deserialize)]
pub struct RendererConfig {
    /// Base URL of the rendering service
    pub endpoint: String,

    /// API token; falls back to BROWSERLESS_TOKEN
    #[serde(default)]
    pub token: Option<String>,
}

/// Output configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    /// CSV file sink; absent disables it
    #[serde(rename = "csv-path", default)]
    pub csv_path: Option<String>,

    /// SQLite sink; absent disables it
    #[serde(rename = "database-path", default)]
    pub database_path: Option<String>,

    /// Directory for best-effort page snapshots
    #[serde(rename = "snapshot-dir", default)]
    pub snapshot_dir: Option<String>,

    /// Append plain-text logs to this file as well as stderr
    #[serde(rename = "log-file", default)]
    pub log_file: Option<String>,
}

/// Run summary notification
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotifyConfig {
    /// Slack incoming webhook; falls back to SLACK_WEBHOOK_URL
    #[serde(rename = "slack-webhook-url", default)]
    pub slack_webhook_url: Option<String>,
}
