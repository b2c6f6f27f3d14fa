//! Timestamp utilities
//!
//! Stored timestamps are RFC 3339 UTC strings with fixed microsecond precision,
//! so string order in SQL matches chronological order.

use chrono::{DateTime, SecondsFormat, Utc};

/// X/Twitter `created_at` format, e.g. `Wed Oct 10 20:19:24 +0000 2018`
const TWITTER_DATE_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Format a timestamp for storage
pub fn to_storage(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp
pub fn from_storage(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse a capture-side creation date
///
/// Accepts the legacy X format and RFC 3339. Anything else yields `None`.
pub fn parse_created_at(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    DateTime::parse_from_str(value, TWITTER_DATE_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
