//! Best-effort conversion of cell values to numbers and timestamps.
//!
//! Coercion never fails loudly: a value that cannot be converted yields
//! `None`, which is the "uncoercible" marker the filter and sort stages
//! act on.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::data::record::DataValue;

/// Naive date-time layouts accepted for string timestamps, read as UTC
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Date-only layouts accepted for string timestamps (midnight UTC)
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Coerce a value to a number.
///
/// Dates become epoch milliseconds and booleans become 1 or 0. Strings are
/// trimmed and parsed; blank or non-numeric strings are uncoercible, as are
/// non-finite results.
pub fn to_number(value: &DataValue) -> Option<f64> {
    let number = match value {
        DataValue::Integer(i) => *i as f64,
        DataValue::Float(f) => *f,
        DataValue::Boolean(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        DataValue::DateTime(dt) => dt.timestamp_millis() as f64,
        DataValue::String(s) => parse_number(s)?,
        DataValue::Null => return None,
    };

    number.is_finite().then_some(number)
}

/// Coerce a value to epoch milliseconds.
///
/// Accepts native dates, numeric epochs (milliseconds) and date strings in
/// the layouts listed in [`parse_timestamp`].
pub fn to_timestamp(value: &DataValue) -> Option<f64> {
    match value {
        DataValue::DateTime(dt) => Some(dt.timestamp_millis() as f64),
        DataValue::Integer(i) => Some(*i as f64),
        DataValue::Float(f) => f.is_finite().then_some(*f),
        DataValue::String(s) => parse_timestamp(s),
        DataValue::Boolean(_) | DataValue::Null => None,
    }
}

/// Parse a numeric string, ignoring surrounding whitespace
pub fn parse_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|number| number.is_finite())
}

/// Parse a date string to epoch milliseconds.
///
/// RFC 3339 strings keep their offset; naive date-times and plain dates are
/// interpreted as UTC.
pub fn parse_timestamp(text: &str) -> Option<f64> {
    parse_datetime(text).map(|dt| dt.timestamp_millis() as f64)
}

/// Parse a date string into a UTC date-time
pub fn parse_datetime(text: &str) -> Option<DateTime<Utc>> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(naive.and_utc());
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
        }
    }

    None
}
