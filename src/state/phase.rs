//! Fetch phases and their recovery table
//!
//! Every fetch the coordinator issues belongs to exactly one phase. The phase
//! alone decides which element the renderer waits for and which parse step
//! receives the document, so a retry always resumes where the failed fetch
//! would have continued.
use crate::config::SelectorConfig;
use std::fmt;

/// The fetch currently in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// A listing page (first page or a followed next-page link)
    ListingFetch,

    /// An item's page as linked from the listing
    DetailRedirect,

    /// The full article behind a headline page's link
    DetailFinal,
}

/// Parse step that consumes a successfully fetched document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resume {
    /// Read items, total count and next-page link
    ListingParse,

    /// Decide between the inline body and the full-article hop
    HeadlineParse,

    /// Extract the article body
    BodyParse,
}

impl Phase {
    /// The element the renderer must see before returning the page
    pub fn wait_selector<'a>(&self, selectors: &'a SelectorConfig) -> &'a str {
        match self {
            Self::ListingFetch => &selectors.listing_container,
            Self::DetailRedirect | Self::DetailFinal => &selectors.article_container,
        }
    }

    /// Where processing continues once this phase's fetch succeeds
    pub fn resume_at(&self) -> Resume {
        match self {
            Self::ListingFetch => Resume::ListingParse,
            Self::DetailRedirect => Resume::HeadlineParse,
            Self::DetailFinal => Resume::BodyParse,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ListingFetch => "listing_fetch",
            Self::DetailRedirect => "detail_redirect",
            Self::DetailFinal => "detail_final",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Retry budget for one unit of work
///
/// A listing page gets its own state; an item keeps one state across its
/// redirect and final hops, so the budget is per item rather than per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryState {
    pub phase: Phase,
    pub attempt: u32,
}

impl RetryState {
    pub fn new(phase: Phase) -> Self {
        Self { phase, attempt: 0 }
    }

    /// Moves to the next hop of the same item, keeping the spent budget
    pub fn advance(&mut self, phase: Phase) {
        self.phase = phase;
    }

    /// True while another attempt is allowed
    pub fn can_retry(&self, max_retries: u32) -> bool {
        self.attempt < max_retries
    }

    pub fn record_failure(&mut self) {
        self.attempt += 1;
    }
}
