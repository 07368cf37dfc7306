//! Output module for run counters and reports
//!
//! This module handles:
//! - Counting what a run fetched, stored, skipped and lost
//! - Formatting the end-of-run report and completion notice
//! - Reading archive statistics back from the database

mod report;
pub mod stats;

pub use report::{completion_notice, format_report};
pub use stats::{load_statistics, print_statistics, ArchiveStatistics, RunStats, SinkCounters};
