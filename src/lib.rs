//! newsharvest: an incremental harvester for paginated news listings
//!
//! This crate walks a site's listing pages newest-first, follows every item to
//! its detail page through an optional redirect hop, extracts the article body,
//! and persists each article exactly once into a CSV file and/or a SQLite
//! database across repeated runs.

pub mod config;
pub mod crawler;
pub mod date;
pub mod notify;
pub mod output;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Parse error: {0}")]
    Parse(#[from] crawler::ParseError),

    #[error("Sink error: {0}")]
    Sink(#[from] storage::SinkError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid selector '{name}': {selector}")]
    InvalidSelector { name: String, selector: String },
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Unresolvable link '{href}' relative to {base}")]
    Unresolvable { href: String, base: String },
}

/// Result type alias for harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Coordinator, RenderingFetcher};
pub use output::RunStats;
pub use state::{CrawlCursor, Phase, RetryState};
pub use storage::{Article, ArticleSink, WriteOutcome};
