use crate::config::types::{
    Config, CrawlerConfig, NotifyConfig, OutputConfig, SelectorConfig, SiteConfig,
};
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_selectors(&config.selectors)?;
    validate_crawler_config(&config.crawler)?;
    validate_http_url("renderer.endpoint", &config.renderer.endpoint)?;
    validate_output_config(&config.output)?;
    validate_notify_config(&config.notify)?;
    Ok(())
}

fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    validate_http_url("site.listing-url", &config.listing_url)?;
    validate_http_url("site.base-url", &config.base_url)?;
    Ok(())
}

/// Every selector must compile; the coordinator relies on it at runtime
fn validate_selectors(config: &SelectorConfig) -> Result<(), ConfigError> {
    for (name, selector) in config.named() {
        if selector.trim().is_empty() || Selector::parse(selector).is_err() {
            return Err(ConfigError::InvalidSelector {
                name: name.to_string(),
                selector: selector.to_string(),
            });
        }
    }
    Ok(())
}

fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.timeout_ms < 1000 {
        return Err(ConfigError::Validation(format!(
            "timeout_ms must be >= 1000ms, got {}ms",
            config.timeout_ms
        )));
    }

    if config.max_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be between 0 and 10, got {}",
            config.max_retries
        )));
    }

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    for (name, path) in [
        ("csv_path", &config.csv_path),
        ("database_path", &config.database_path),
        ("snapshot_dir", &config.snapshot_dir),
        ("log_file", &config.log_file),
    ] {
        if matches!(path.as_deref(), Some(p) if p.trim().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "{} cannot be empty when set",
                name
            )));
        }
    }

    Ok(())
}

fn validate_notify_config(config: &NotifyConfig) -> Result<(), ConfigError> {
    match config.slack_webhook_url.as_deref() {
        Some(url) if !url.trim().is_empty() => validate_http_url("notify.slack-webhook-url", url),
        _ => Ok(()),
    }
}

/// Accepts only absolute http(s) URLs
fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            field, value
        )));
    }

    Ok(())
}

impl SelectorConfig {
    /// Selectors paired with their config key, in file order
    pub fn named(&self) -> [(&'static str, &str); 11] {
        [
            ("listing-container", self.listing_container.as_str()),
            ("item", self.item.as_str()),
            ("title", self.title.as_str()),
            ("date", self.date.as_str()),
            ("link", self.link.as_str()),
            ("total-count", self.total_count.as_str()),
            ("next-page", self.next_page.as_str()),
            ("article-container", self.article_container.as_str()),
            ("full-article-link", self.full_article_link.as_str()),
            ("headline-content", self.headline_content.as_str()),
            ("article-content", self.article_content.as_str()),
        ]
    }
}
