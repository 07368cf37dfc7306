use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Environment variable consulted when `notify.slack-webhook-url` is empty
pub const SLACK_WEBHOOK_ENV: &str = "SLACK_WEBHOOK_URL";

/// Environment variable consulted when `renderer.token` is empty
pub const RENDERER_TOKEN_ENV: &str = "BROWSERLESS_TOKEN";

/// Loads and parses a configuration file from the given path
///
/// Secrets left empty in the file are filled from the environment
/// (`SLACK_WEBHOOK_URL`, `BROWSERLESS_TOKEN`) before validation.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use newsharvest::config::load_config;
///
/// let config = load_config(Path::new("harvest.toml")).unwrap();
/// println!("Listing: {}", config.site.listing_url);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;

    let mut config: Config = toml::from_str(&content)?;

    fill_from_env(&mut config, |key| std::env::var(key).ok());

    validate(&config)?;

    Ok(config)
}

/// Fills empty secret fields using `lookup`
fn fill_from_env(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if is_blank(&config.notify.slack_webhook_url) {
        config.notify.slack_webhook_url = lookup(SLACK_WEBHOOK_ENV).filter(|v| !v.is_empty());
    }

    if is_blank(&config.renderer.token) {
        config.renderer.token = lookup(RENDERER_TOKEN_ENV).filter(|v| !v.is_empty());
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at startup so runs can be tied to the selector set they used.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}
