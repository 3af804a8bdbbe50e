//! Timestamp encoding
//!
//! Timestamps are stored as fixed-width UTC text so that SQLite's text
//! comparison orders them chronologically. Caller-supplied bounds are
//! normalized into the same form before they reach a query.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};

use crate::error::TimestampError;

/// Storage format: `2024-05-01T10:00:00.000000000Z`
pub const STORED_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.9fZ";

/// Display format used when projecting entries
pub const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f UTC";

/// Years whose stored form is four digits wide
pub const STORABLE_YEARS: std::ops::RangeInclusive<i32> = 0..=9999;

/// Whether `ts` has a fixed-width stored form
pub fn is_storable(ts: &DateTime<Utc>) -> bool {
    STORABLE_YEARS.contains(&ts.year())
}

/// Encode a timestamp into its stored form
///
/// Only fixed-width for [`is_storable`] timestamps.
pub fn to_stored(ts: &DateTime<Utc>) -> String {
    ts.format(STORED_FORMAT).to_string()
}

/// Decode a stored timestamp
pub fn from_stored(stored: &str) -> Result<DateTime<Utc>, TimestampError> {
    DateTime::parse_from_rfc3339(stored)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| TimestampError::Unrecognized(stored.to_string()))
}

/// Render a timestamp for display
///
/// The output does not depend on locale; fractional seconds are omitted
/// when zero.
pub fn display(ts: &DateTime<Utc>) -> String {
    ts.format(DISPLAY_FORMAT).to_string()
}

/// Parse a caller-supplied timestamp
///
/// Accepted forms:
/// - RFC 3339 (`2024-05-01T10:00:00Z`, `2024-05-01T12:00:00+02:00`)
/// - `2024-05-01 10:00:00[.fff][+02:00]`
/// - the display form `2024-05-01 10:00:00 +0000 UTC`
/// - `2024-05-01T10:00:00[.fff]` or `2024-05-01 10:00:00[.fff]` without offset (UTC)
/// - a bare date `2024-05-01` (midnight UTC)
pub fn parse_timestamp(input: &str) -> Result<DateTime<Utc>, TimestampError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(TimestampError::Empty);
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(input) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = DateTime::parse_from_str(input, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Some(rest) = input.strip_suffix(" UTC") {
        if let Ok(ts) = DateTime::parse_from_str(rest, "%Y-%m-%d %H:%M:%S%.f %z") {
            return Ok(ts.with_timezone(&Utc));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(rest, "%Y-%m-%d %H:%M:%S%.f") {
            return Ok(naive.and_utc());
        }
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return Ok(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }

    Err(TimestampError::Unrecognized(input.to_string()))
}

/// Parse a caller-supplied timestamp and return its stored form
///
/// Bounds outside [`STORABLE_YEARS`] are rejected; their stored form would
/// not compare correctly against stored entries.
pub fn normalize(input: &str) -> Result<String, TimestampError> {
    let ts = parse_timestamp(input)?;
    if !is_storable(&ts) {
        return Err(TimestampError::OutOfRange(ts.year()));
    }
    Ok(to_stored(&ts))
}
