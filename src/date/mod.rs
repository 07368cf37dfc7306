//! Date handling for listing timestamps
//!
//! Listing pages show dates as `"M/D(weekday) hh:mm"` without a year, in
//! Japan Standard Time. This module turns them into sortable `YYYYMMDDhhmm`
//! keys and provides the Asia/Tokyo notion of "today".

mod normalize;

pub use normalize::{
    normalize, resolve_year, today_key, tokyo_now, tokyo_timestamp, tokyo_today, NormalizedDate,
};

use thiserror::Error;

/// Errors produced while normalizing a listing date
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateError {
    #[error("Bad date format: '{0}'")]
    BadFormat(String),
}
