//! Conversions between chrono values and their TEXT column encodings.

use chrono::{DateTime, Local, NaiveDate, Utc};

/// Today's calendar date in the learner's local timezone. Daily quotas and
/// "last correct" dates are calendar concepts, not UTC instants.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Format a calendar date as YYYY-MM-DD for storage.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Parse a YYYY-MM-DD column value; malformed text reads as unset.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()
}

/// Format a timestamp as RFC 3339 for storage.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339()
}

/// Parse an RFC 3339 column value; malformed text reads as unset.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}
