//! Date parsing into tz-naive UTC instants.
//!
//! Offset-bearing values are shifted to UTC before the zone is dropped, so
//! every stored date compares without ambiguity. Date-only values land on
//! midnight.

use arrow::array::{Array, BooleanArray, StringArray, TimestampMillisecondArray};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

/// Configuration for date format handling
#[derive(Debug, Clone)]
pub struct DateFormatConfig {
    /// Formats carrying an explicit UTC offset (`%z`)
    pub offset_formats: Vec<String>,
    /// Naive date-time formats, interpreted as UTC
    pub datetime_formats: Vec<String>,
    /// Date-only formats
    pub date_formats: Vec<String>,
    /// Enable heuristic format detection
    pub enable_format_detection: bool,
}

impl Default for DateFormatConfig {
    fn default() -> Self {
        Self {
            offset_formats: vec![
                "%Y-%m-%d %H:%M:%S%z".to_string(),
                "%Y-%m-%d %H:%M:%S%.f%z".to_string(),
                "%Y-%m-%dT%H:%M:%S%z".to_string(),
            ],
            datetime_formats: vec![
                "%Y-%m-%d %H:%M:%S".to_string(),
                "%Y-%m-%dT%H:%M:%S".to_string(),
                "%Y-%m-%d %H:%M:%S%.f".to_string(),
                "%Y-%m-%dT%H:%M:%S%.f".to_string(),
                "%Y-%m-%d %H:%M".to_string(),
            ],
            date_formats: vec![
                "%Y-%m-%d".to_string(), // ISO format: 2023-01-15
                "%Y/%m/%d".to_string(), // 2023/01/15
                "%m/%d/%Y".to_string(), // US: 01/15/2023
                "%d.%m.%Y".to_string(), // 15.01.2023
                "%Y%m%d".to_string(),   // Compact: 20230115
                "%d %b %Y".to_string(), // 15 Jan 2023
                "%d %B %Y".to_string(), // 15 January 2023
            ],
            enable_format_detection: true,
        }
    }
}

/// Parse a date-like string into a tz-naive UTC instant
#[must_use]
pub fn parse_datetime(s: &str, config: &DateFormatConfig) -> Option<NaiveDateTime> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc).naive_utc());
    }

    for format in &config.offset_formats {
        if let Ok(dt) = DateTime::parse_from_str(s, format) {
            return Some(dt.with_timezone(&Utc).naive_utc());
        }
    }

    for format in &config.datetime_formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt);
        }
    }

    parse_date_string(s, config).map(|date| date.and_time(NaiveTime::MIN))
}

/// Parse a date-only string with multiple format attempts
#[must_use]
pub fn parse_date_string(s: &str, config: &DateFormatConfig) -> Option<NaiveDate> {
    for format in &config.date_formats {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return Some(date);
        }
    }

    if config.enable_format_detection {
        if let Some(detected_format) = detect_date_format(s) {
            if let Ok(date) = NaiveDate::parse_from_str(s, detected_format) {
                return Some(date);
            }
        }
    }

    None
}

/// Try to detect the date format based on string patterns
#[must_use]
pub fn detect_date_format(s: &str) -> Option<&'static str> {
    // Dashes with the year last (DD-MM-YYYY)
    let dashed: Vec<&str> = s.split('-').collect();
    if dashed.len() == 3 && dashed[2].len() == 4 {
        return Some("%d-%m-%Y");
    }

    let slashed: Vec<&str> = s.split('/').collect();
    if slashed.len() == 3 && slashed[2].len() == 4 {
        // A first part above 12 can only be a day
        if slashed[0].parse::<u8>().is_ok_and(|first| first > 12) {
            return Some("%d/%m/%Y");
        }
    }

    None
}

/// Convert a string array into millisecond timestamps
///
/// Returns the converted array and a mask that is `false` wherever a
/// non-null input failed to parse.
#[must_use]
pub fn coerce_datetime(
    array: &StringArray,
    config: &DateFormatConfig,
) -> (TimestampMillisecondArray, BooleanArray) {
    let mut values = Vec::with_capacity(array.len());
    let mut ok = Vec::with_capacity(array.len());

    for value in array {
        match value {
            None => {
                values.push(None);
                ok.push(true);
            }
            Some(s) => match parse_datetime(s, config) {
                Some(dt) => {
                    values.push(Some(dt.and_utc().timestamp_millis()));
                    ok.push(true);
                }
                None => {
                    values.push(None);
                    ok.push(false);
                }
            },
        }
    }

    (
        TimestampMillisecondArray::from(values),
        BooleanArray::from(ok),
    )
}
