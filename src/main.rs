//! newsharvest main entry point
//!
//! This is the command-line interface for the newsharvest listing harvester.

use clap::Parser;
use newsharvest::config::{load_config_with_hash, Config};
use newsharvest::crawler::{BrowserlessFetcher, Coordinator};
use newsharvest::date::tokyo_timestamp;
use newsharvest::notify::{notify, Notifier, SlackNotifier};
use newsharvest::output::{completion_notice, format_report};
use newsharvest::storage::open_sinks;
use newsharvest::ConfigError;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// newsharvest: an incremental news-listing harvester
///
/// newsharvest walks a paginated listing newest-first, follows every item to
/// its article, and stores each article exactly once in a CSV file and/or a
/// SQLite database, however often it is run.
#[derive(Parser, Debug)]
#[command(name = "newsharvest")]
#[command(version = "1.0.0")]
#[command(about = "An incremental news-listing harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be harvested without fetching
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,

    /// Do not post the completion notice
    #[arg(long)]
    no_notify: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let loaded = load_config_with_hash(&cli.config);
    let log_file = loaded
        .as_ref()
        .ok()
        .and_then(|(config, _)| config.output.log_file.clone());

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet, log_file.as_deref().map(Path::new))?;

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = match loaded {
        Ok((config, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_harvest(config, cli.no_notify).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// With a log file configured, the same events are appended to it without
/// ANSI colors.
fn setup_logging(
    verbose: u8,
    quiet: bool,
    log_file: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("newsharvest=info,warn"),
            1 => EnvFilter::new("newsharvest=debug,info"),
            2 => EnvFilter::new("newsharvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false),
        )
        .with(file_layer)
        .init();

    Ok(())
}

/// Handles the --dry-run mode: validates config and shows what would be harvested
fn handle_dry_run(config: &Config) {
    println!("=== newsharvest Dry Run ===\n");

    println!("Site:");
    println!("  Listing: {}", config.site.listing_url);
    println!("  Base URL: {}", config.site.base_url);

    println!("\nCrawler Configuration:");
    println!("  Page timeout: {}ms", config.crawler.timeout_ms);
    println!("  Max retries: {}", config.crawler.max_retries);
    println!("  Today only: {}", config.crawler.restrict_to_today);
    println!("  Delay between items: {}ms", config.crawler.inter_item_delay_ms);

    println!("\nRenderer:");
    println!("  Endpoint: {}", config.renderer.endpoint);
    println!(
        "  Token: {}",
        if config.renderer.token.is_some() { "set" } else { "none" }
    );

    println!("\nSelectors:");
    for (name, selector) in config.selectors.named() {
        println!("  {}: {}", name, selector);
    }

    println!("\nOutput:");
    println!(
        "  CSV: {}",
        config.output.csv_path.as_deref().unwrap_or("disabled")
    );
    println!(
        "  Database: {}",
        config.output.database_path.as_deref().unwrap_or("disabled")
    );
    println!(
        "  Snapshots: {}",
        config.output.snapshot_dir.as_deref().unwrap_or("disabled")
    );
    println!(
        "  Notifications: {}",
        if config.notify.slack_webhook_url.is_some() { "slack" } else { "disabled" }
    );

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> newsharvest::Result<()> {
    use newsharvest::output::{load_statistics, print_statistics};
    use newsharvest::storage::SqliteSink;

    let Some(path) = &config.output.database_path else {
        let missing = ConfigError::Validation("output.database-path is not set".to_string());
        return Err(missing.into());
    };

    println!("Database: {}\n", path);

    let sink = SqliteSink::open(Path::new(path))?;
    let stats = load_statistics(&sink)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(config: Config, no_notify: bool) -> newsharvest::Result<()> {
    // Sinks open before any fetch; a sink that cannot open aborts here
    let sinks = match open_sinks(&config.output) {
        Ok(sinks) => sinks,
        Err(e) => {
            tracing::error!("Harvest aborted: {}", e);
            return Err(e.into());
        }
    };

    let notifier = if no_notify {
        None
    } else {
        build_notifier(&config)
    };

    let fetcher = BrowserlessFetcher::new(&config.renderer)?;
    let mut coordinator = Coordinator::new(config, Box::new(fetcher), sinks)?;

    let finished = tokio::select! {
        stats = coordinator.run() => Some(stats),
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted, closing sinks");
            None
        }
    };

    if let Err(e) = coordinator.close_sinks() {
        tracing::error!("Failed to close sinks: {}", e);
    }

    let completed = finished.is_some();
    let stats = finished.unwrap_or_else(|| coordinator.stats().clone());
    let report = format_report(&stats);
    println!("{}", report);

    if completed {
        if let Some(notifier) = notifier {
            let notice = completion_notice(&tokyo_timestamp(), &report);
            notify(notifier.as_ref(), &notice).await;
        }
    }

    Ok(())
}

fn build_notifier(config: &Config) -> Option<Box<dyn Notifier>> {
    let url = config.notify.slack_webhook_url.as_deref()?;
    match SlackNotifier::new(url) {
        Ok(notifier) => Some(Box::new(notifier)),
        Err(e) => {
            tracing::warn!("Notifications disabled: {}", e);
            None
        }
    }
}
