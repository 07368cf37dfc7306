use crate::date::DateError;
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Utc};

/// Japan Standard Time, UTC+9 with no daylight saving
const JST_OFFSET_SECS: i32 = 9 * 3600;

/// A listing date reduced to zero-padded month/day and hour/minute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedDate {
    /// `MMDD`
    pub date: String,
    /// `hhmm`
    pub time: String,
}

impl NormalizedDate {
    /// True when this date falls on the same month and day as `today`
    pub fn is_on(&self, today: NaiveDate) -> bool {
        self.date == today_key(today)
    }
}

/// Normalizes a listing date of the form `"M/D(weekday) hh:mm"`
///
/// The part before `(` carries month and day, the first token after `)`
/// carries hour and minute. Every field is zero-padded to two digits.
///
/// # Examples
///
/// ```
/// use newsharvest::date::normalize;
///
/// let date = normalize("3/5(水) 9:7").unwrap();
/// assert_eq!(date.date, "0305");
/// assert_eq!(date.time, "0907");
/// assert!(normalize("garbage").is_err());
/// ```
pub fn normalize(raw: &str) -> Result<NormalizedDate, DateError> {
    let bad = || DateError::BadFormat(raw.to_string());

    let (month_day, rest) = raw.split_once('(').ok_or_else(bad)?;
    let (_weekday, after) = rest.split_once(')').ok_or_else(bad)?;
    let time = after.split_whitespace().next().ok_or_else(bad)?;

    let (month, day) = month_day.trim().split_once('/').ok_or_else(bad)?;
    let (hour, minute) = time.split_once(':').ok_or_else(bad)?;

    let month = parse_field(month, 1, 12).ok_or_else(bad)?;
    let day = parse_field(day, 1, 31).ok_or_else(bad)?;
    let hour = parse_field(hour, 0, 23).ok_or_else(bad)?;
    let minute = parse_field(minute, 0, 59).ok_or_else(bad)?;

    Ok(NormalizedDate {
        date: format!("{:02}{:02}", month, day),
        time: format!("{:02}{:02}", hour, minute),
    })
}

/// Parses a one- or two-digit field and range-checks it
fn parse_field(field: &str, min: u32, max: u32) -> Option<u32> {
    if field.is_empty() || field.len() > 2 || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value: u32 = field.parse().ok()?;
    (min..=max).contains(&value).then_some(value)
}

/// Attaches a year to a normalized date, producing `YYYYMMDDhhmm`
///
/// Dates up to and including today's month/day belong to the current year;
/// later ones can only come from last December onwards, so they get the
/// previous year.
pub fn resolve_year(date: &NormalizedDate, today: NaiveDate) -> String {
    let year = if date.date.as_str() <= today_key(today).as_str() {
        today.year()
    } else {
        today.year() - 1
    };
    format!("{}{}{}", year, date.date, date.time)
}

/// `MMDD` for the given day
pub fn today_key(today: NaiveDate) -> String {
    today.format("%m%d").to_string()
}

/// Current wall-clock time in Asia/Tokyo
pub fn tokyo_now() -> DateTime<FixedOffset> {
    let jst = FixedOffset::east_opt(JST_OFFSET_SECS).expect("UTC+9 is a valid offset");
    Utc::now().with_timezone(&jst)
}

/// Today's date in Asia/Tokyo
pub fn tokyo_today() -> NaiveDate {
    tokyo_now().date_naive()
}

/// Current Asia/Tokyo time as `YYYYMMDDhhmm`
pub fn tokyo_timestamp() -> String {
    tokyo_now().format("%Y%m%d%H%M").to_string()
}
