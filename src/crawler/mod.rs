//! Crawler module for listing traversal and article extraction
//!
//! This module contains the core harvesting logic, including:
//! - Rendering fetches through a headless-browser service
//! - HTML extraction for listing, headline and article pages
//! - Bounded retries that resume at the right parse step
//! - Overall harvest coordination

mod coordinator;
mod fetcher;
mod parser;
mod retry;

pub use coordinator::Coordinator;
pub use fetcher::{BrowserlessFetcher, FetchError, RenderedDocument, RenderingFetcher};
pub use parser::{
    clean_text, parse_body, parse_headline, parse_listing, Headline, ListingItem, ListingPage,
    PageSelectors, ParseError,
};
pub use retry::{Continuation, RetryController, TerminalFailure};

use crate::config::Config;
use crate::output::RunStats;
use crate::storage::open_sinks;

/// Runs a complete harvest against the configured rendering service
///
/// Opens the configured sinks, walks the listing, and closes the sinks
/// again. A sink that cannot be opened aborts the run before any page is
/// fetched.
///
/// # Arguments
///
/// * `config` - The harvester configuration
///
/// # Returns
///
/// * `Ok(RunStats)` - The run completed; per-item failures are in the stats
/// * `Err(HarvestError)` - A sink or the renderer client could not be set up
pub async fn harvest(config: Config) -> crate::Result<RunStats> {
    let sinks = open_sinks(&config.output)?;
    let fetcher = BrowserlessFetcher::new(&config.renderer)?;

    let mut coordinator = Coordinator::new(config, Box::new(fetcher), sinks)?;
    let stats = coordinator.run().await;
    coordinator.close_sinks()?;

    Ok(stats)
}
