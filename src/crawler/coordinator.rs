//! Crawl coordinator - the harvest state machine
//!
//! This module walks the listing newest-first and drives every item through
//! its fetch sequence, including:
//! - Listing fetch, item dispatch and pagination
//! - The day-boundary stop rule
//! - Detail fetches through an optional headline hop, with retries
//! - Handing each article to every sink exactly once
//! - Counting outcomes for the run report

use crate::config::Config;
use crate::crawler::fetcher::RenderingFetcher;
use crate::crawler::parser::{
    parse_body, parse_headline, parse_listing, Headline, ListingItem, ListingPage, PageSelectors,
};
use crate::crawler::retry::{Continuation, RetryController, TerminalFailure};
use crate::date::{normalize, resolve_year, tokyo_now, tokyo_today};
use crate::output::RunStats;
use crate::state::{CrawlCursor, Phase, Resume, RetryState};
use crate::storage::{Article, ArticleSink, WriteOutcome, EXTRACTION_MISS};
use crate::url::{canonical_article_url, resolve_link};
use crate::{HarvestError, UrlError};
use chrono::NaiveDate;
use std::time::Duration;
use url::Url;

/// Steps of the listing-level state machine
#[derive(Debug)]
enum CrawlStep {
    /// Fetch the listing page at this URL
    FetchListing(Url),

    /// Dispatch the items of a fetched listing page in order
    DispatchItems { page_url: Url, listing: ListingPage },

    /// Follow the next-page link if the target window is still open
    PaginateOrStop {
        page_url: Url,
        next_page: Option<String>,
    },

    Finished,
}

/// What became of one listing entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemOutcome {
    /// The item went through the detail fetch (successfully or not)
    Dispatched,

    /// The entry could not be dispatched and was skipped
    Skipped,

    /// The entry is outside the target window; stop the run
    OutOfWindow,
}

/// Main harvest coordinator
pub struct Coordinator {
    config: Config,
    selectors: PageSelectors,
    listing_url: Url,
    base_url: Url,
    fetcher: Box<dyn RenderingFetcher>,
    sinks: Vec<Box<dyn ArticleSink>>,
    retry: RetryController,
    today: NaiveDate,
    cursor: CrawlCursor,
    stats: RunStats,
    dispatched_any: bool,
}

impl Coordinator {
    /// Creates a coordinator over already-opened sinks
    ///
    /// # Arguments
    ///
    /// * `config` - Validated configuration
    /// * `fetcher` - The rendering service
    /// * `sinks` - Open sinks; each article is handed to every one of them
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(HarvestError)` - A selector or the listing URL is invalid
    pub fn new(
        config: Config,
        fetcher: Box<dyn RenderingFetcher>,
        sinks: Vec<Box<dyn ArticleSink>>,
    ) -> Result<Self, HarvestError> {
        let selectors = PageSelectors::compile(&config.selectors)?;
        let listing_url = Url::parse(&config.site.listing_url)
            .map_err(|e| UrlError::Parse(format!("{}: {}", config.site.listing_url, e)))?;
        let base_url = Url::parse(&config.site.base_url)
            .map_err(|e| UrlError::Parse(format!("{}: {}", config.site.base_url, e)))?;

        let mut retry = RetryController::new(
            config.selectors.clone(),
            config.crawler.max_retries,
            Duration::from_millis(config.crawler.timeout_ms),
        );
        if let Some(dir) = &config.output.snapshot_dir {
            retry = retry.with_snapshot_dir(dir);
        }

        if sinks.is_empty() {
            tracing::warn!("No sinks configured; articles will be fetched but not stored");
        }

        let mut stats = RunStats::new();
        for sink in &sinks {
            stats.register_sink(sink.name());
        }

        Ok(Self {
            config,
            selectors,
            listing_url,
            base_url,
            fetcher,
            sinks,
            retry,
            today: tokyo_today(),
            cursor: CrawlCursor::new(),
            stats,
            dispatched_any: false,
        })
    }

    /// Overrides the date the stop rule and year resolution compare against
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Counters so far; complete once `run` has returned
    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// Runs the harvest to completion
    ///
    /// Per-item failures never end the run; they are counted and listed in
    /// the returned statistics.
    pub async fn run(&mut self) -> RunStats {
        self.stats.started_at = Some(tokyo_now());
        tracing::info!(
            "Harvest started for {} (today is {})",
            self.listing_url,
            self.today
        );

        let mut step = CrawlStep::FetchListing(self.listing_url.clone());
        loop {
            step = match step {
                CrawlStep::FetchListing(page_url) => self.fetch_listing(page_url).await,
                CrawlStep::DispatchItems { page_url, listing } => {
                    self.dispatch_items(page_url, listing).await
                }
                CrawlStep::PaginateOrStop {
                    page_url,
                    next_page,
                } => self.paginate_or_stop(&page_url, next_page),
                CrawlStep::Finished => break,
            };
        }

        self.stats.finished_at = Some(tokyo_now());
        tracing::info!(
            "Harvest finished: {} fetched, {} delivered, {} without body, {} failed",
            self.stats.fetched,
            self.stats.delivered,
            self.stats.degraded,
            self.stats.failed
        );

        self.stats.clone()
    }

    async fn fetch_listing(&mut self, page_url: Url) -> CrawlStep {
        tracing::info!(
            "Fetching listing page {}: {}",
            self.cursor.page_number,
            page_url
        );

        let mut state = RetryState::new(Phase::ListingFetch);
        let continuation = match self
            .retry
            .fetch(self.fetcher.as_ref(), page_url.as_str(), &mut state, &self.cursor)
            .await
        {
            Ok(continuation) => continuation,
            Err(failure) => {
                tracing::error!(
                    "Listing page {} unavailable, ending pagination: {}",
                    self.cursor.page_number,
                    failure.reason
                );
                self.record_failure(page_url.as_str());
                return CrawlStep::Finished;
            }
        };

        let page_number = self.cursor.page_number;
        self.retry
            .snapshot_listing(self.fetcher.as_ref(), page_url.as_str(), page_number)
            .await;

        let listing = parse_listing(&continuation.document.html, &self.selectors);
        self.stats.pages += 1;

        if self.cursor.page_number == 1 {
            self.stats.total_advertised = listing.total_advertised;
            match listing.total_advertised {
                Some(total) => tracing::info!("Listing advertises {} items", total),
                None => tracing::debug!("No total count on listing page"),
            }
        }
        tracing::debug!(
            "Listing page {} has {} items",
            self.cursor.page_number,
            listing.items.len()
        );

        CrawlStep::DispatchItems { page_url, listing }
    }

    async fn dispatch_items(&mut self, page_url: Url, listing: ListingPage) -> CrawlStep {
        for (index, item) in listing.items.into_iter().enumerate() {
            self.cursor.at_item(index);

            if self.process_item(item).await == ItemOutcome::OutOfWindow {
                break;
            }
        }

        CrawlStep::PaginateOrStop {
            page_url,
            next_page: listing.next_page,
        }
    }

    fn paginate_or_stop(&mut self, page_url: &Url, next_page: Option<String>) -> CrawlStep {
        if !self.cursor.within_target_window() {
            tracing::info!("Reached items outside the target day, stopping");
            return CrawlStep::Finished;
        }

        let Some(href) = next_page else {
            tracing::info!("No next page after page {}", self.cursor.page_number);
            return CrawlStep::Finished;
        };

        match resolve_link(&href, page_url) {
            Ok(next) if next == *page_url => {
                tracing::warn!("Next-page link points back to {}, stopping", page_url);
                CrawlStep::Finished
            }
            Ok(next) => {
                self.cursor.next_page();
                CrawlStep::FetchListing(next)
            }
            Err(e) => {
                tracing::warn!("Unusable next-page link: {}", e);
                CrawlStep::Finished
            }
        }
    }

    /// Takes one listing entry from dispatch to persistence
    ///
    /// Item links are resolved against the site's base URL.
    async fn process_item(&mut self, item: ListingItem) -> ItemOutcome {
        let sequence_id = self.cursor.sequence_id();
        let title = item.title.unwrap_or_else(|| EXTRACTION_MISS.to_string());

        let Some(href) = item.href else {
            tracing::warn!("[{}] '{}' has no link, skipping", sequence_id, title);
            self.stats.malformed += 1;
            return ItemOutcome::Skipped;
        };

        let url = match resolve_link(&href, &self.base_url)
            .and_then(|resolved| canonical_article_url(resolved.as_str()))
        {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("[{}] '{}' has an unusable link: {}", sequence_id, title, e);
                self.stats.malformed += 1;
                return ItemOutcome::Skipped;
            }
        };

        let published_at = match self.published_at(&sequence_id, item.raw_date.as_deref()) {
            Some(published_at) => published_at,
            None => {
                self.cursor.leave_target_window();
                return ItemOutcome::OutOfWindow;
            }
        };

        if self.dispatched_any && self.config.crawler.inter_item_delay_ms > 0 {
            let delay = Duration::from_millis(self.config.crawler.inter_item_delay_ms);
            tokio::time::sleep(delay).await;
        }
        self.dispatched_any = true;
        self.stats.fetched += 1;
        tracing::info!("[{}] {} {}", sequence_id, title, url);

        let body = match self.fetch_body(&url).await {
            Ok(body) => body,
            Err(_) => {
                self.record_failure(&url);
                return ItemOutcome::Dispatched;
            }
        };

        let article = Article {
            title,
            sequence_id,
            published_at,
            url,
            body: body.unwrap_or_else(|| EXTRACTION_MISS.to_string()),
        };

        if article.is_degraded() {
            tracing::warn!(
                "[{}] no article body found at {}",
                article.sequence_id,
                article.url
            );
            self.stats.record_degraded(&article.url);
        } else {
            self.stats.record_delivered();
        }
        self.persist(&article);

        ItemOutcome::Dispatched
    }

    /// Normalized `published_at`, or `None` when the stop rule applies
    ///
    /// An unparseable date never stops the run; the raw text is kept instead.
    fn published_at(&self, sequence_id: &str, raw_date: Option<&str>) -> Option<String> {
        let Some(raw) = raw_date else {
            tracing::warn!("[{}] no date on listing entry", sequence_id);
            return Some(EXTRACTION_MISS.to_string());
        };

        match normalize(raw) {
            Ok(date) => {
                if self.config.crawler.restrict_to_today && !date.is_on(self.today) {
                    tracing::info!(
                        "[{}] dated {} {}, outside the target day",
                        sequence_id,
                        date.date,
                        date.time
                    );
                    return None;
                }
                Some(resolve_year(&date, self.today))
            }
            Err(e) => {
                tracing::warn!("[{}] {}", sequence_id, e);
                Some(raw.trim().to_string())
            }
        }
    }

    /// Fetches an item's body through the headline hop if there is one
    ///
    /// `Ok(None)` means the page loaded without extractable text. The retry
    /// budget is shared by both hops of the item.
    async fn fetch_body(&self, url: &str) -> Result<Option<String>, TerminalFailure> {
        let mut state = RetryState::new(Phase::DetailRedirect);
        let mut target = url.to_string();

        loop {
            let Continuation { resume, document } = self
                .retry
                .fetch(self.fetcher.as_ref(), &target, &mut state, &self.cursor)
                .await?;

            match resume {
                Resume::HeadlineParse => match parse_headline(&document.html, &self.selectors) {
                    Headline::Inline(body) => return Ok(body),
                    Headline::FullArticle(href) => {
                        let next = Url::parse(&document.url)
                            .map_err(|e| UrlError::Parse(e.to_string()))
                            .and_then(|base| resolve_link(&href, &base));
                        match next {
                            Ok(next) => {
                                tracing::debug!(
                                    "[{}] following full article link {}",
                                    self.cursor.sequence_id(),
                                    next
                                );
                                target = next.to_string();
                                state.advance(Phase::DetailFinal);
                            }
                            Err(e) => {
                                tracing::warn!(
                                    "[{}] unusable full article link: {}",
                                    self.cursor.sequence_id(),
                                    e
                                );
                                return Ok(None);
                            }
                        }
                    }
                },
                _ => return Ok(parse_body(&document.html, &self.selectors)),
            }
        }
    }

    /// Counts a terminal failure and stores its sentinel record
    fn record_failure(&mut self, url: &str) {
        self.stats.record_failed(url);
        self.persist(&Article::failed(url));
    }

    /// Hands an article to every sink; one sink failing never blocks another
    fn persist(&mut self, article: &Article) {
        let mut stored_anywhere = false;

        for sink in self.sinks.iter_mut() {
            let result = sink.write(article);
            if matches!(result, Ok(WriteOutcome::Stored)) {
                stored_anywhere = true;
            }
            self.stats.record_write(sink.name(), &article.url, &result);
        }

        if stored_anywhere {
            self.stats.persisted += 1;
        }
    }

    /// Flushes and closes every sink
    ///
    /// Every sink is closed even if an earlier one fails; the first error is
    /// returned.
    pub fn close_sinks(&mut self) -> Result<(), HarvestError> {
        let mut first_error = None;

        for sink in self.sinks.iter_mut() {
            match sink.close() {
                Ok(()) => tracing::debug!("Closed {} sink", sink.name()),
                Err(e) => {
                    tracing::error!("Closing {} sink failed: {}", sink.name(), e);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }
}
