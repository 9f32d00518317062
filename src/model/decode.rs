//! Field decoders applied while turning a raw row into an entity.
//!
//! Dumps store every cell as text, so each typed field of [`Post`] and
//! [`Tag`] goes through one of these functions. Empty cells are nulls.
//!
//! [`Post`]: crate::model::Post
//! [`Tag`]: crate::model::Tag

use std::time::Duration;

use chrono::NaiveDateTime;

use crate::error::{Error, Result};

const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"];

/// Dumps encode booleans as `t`/`f`; anything else reads as false.
pub fn parse_bool(value: &str) -> bool {
    value == "t"
}

pub fn parse_int(column: &str, value: &str) -> Result<i64> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|e| Error::decode(column, value, e))
}

pub fn parse_opt_int(column: &str, value: &str) -> Result<Option<i64>> {
    if value.trim().is_empty() {
        return Ok(None);
    }
    parse_int(column, value).map(Some)
}

pub fn parse_unsigned(column: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|e| Error::decode(column, value, e))
}

/// Some rows carry no fractional seconds, so both layouts are accepted.
pub fn parse_datetime(column: &str, value: &str) -> Result<Option<NaiveDateTime>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(Some)
        .ok_or_else(|| Error::decode(column, value, "not a 'YYYY-MM-DD HH:MM:SS[.f]' timestamp"))
}

pub fn parse_required_datetime(column: &str, value: &str) -> Result<NaiveDateTime> {
    parse_datetime(column, value)?.ok_or_else(|| Error::decode(column, value, "value is required"))
}

/// Duration is stored as fractional seconds.
pub fn parse_duration(column: &str, value: &str) -> Result<Option<Duration>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    let seconds = value
        .parse::<f64>()
        .map_err(|e| Error::decode(column, value, e))?;
    Duration::try_from_secs_f64(seconds)
        .map(Some)
        .map_err(|e| Error::decode(column, value, e))
}

pub fn parse_words(value: &str) -> Vec<String> {
    value.split_whitespace().map(str::to_string).collect()
}
