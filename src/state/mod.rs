//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `Phase`: which fetch is in flight, and where a retry of it resumes
//! - `RetryState`: the retry budget of one item or listing page
//! - `CrawlCursor`: pagination position and the day-boundary latch

mod cursor;
mod phase;

// Re-export main types
pub use cursor::CrawlCursor;
pub use phase::{Phase, Resume, RetryState};
