//! Serde helpers for the loosely typed payloads the chat service returns.

use chrono::{DateTime, NaiveDateTime, Utc};
use std::fmt::Display;

use serde::{Deserialize, Deserializer, Serializer};

use super::message::Citation;

/// Timestamps arrive either as RFC 3339 or as naive ISO-8601 without an offset.
/// Naive values are taken as UTC.
pub fn timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(serde::de::Error::custom)
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .map(|naive| naive.and_utc())
        .map_err(|e| format!("invalid timestamp {:?}: {}", raw, e))
}

/// Accept `"7"` or `7` and keep it as text.
pub fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

/// Citations are a list when present, but older rows hold an object or null.
/// Anything that is not a list of citations is treated as absent.
/// Write any id as a JSON string; the service types ids in request bodies as `str`.
pub fn as_string<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    T: Display,
    S: Serializer,
{
    serializer.collect_str(value)
}

pub fn lenient_citations<'de, D>(deserializer: D) -> Result<Option<Vec<Citation>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(v @ serde_json::Value::Array(_)) => serde_json::from_value(v).ok(),
        _ => None,
    })
}
