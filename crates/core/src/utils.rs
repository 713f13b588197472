use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value;

/// Outcome of coercing one JSON value into a timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Coerced {
    Missing,
    Parsed(NaiveDateTime),
    Invalid(String),
}

/// Parses a timestamp string into naive UTC.
/// Supports various formats: RFC 3339, ISO 8601 without offset, SQLite datetime, date only.
pub fn parse_timestamp(timestamp_str: &str) -> Option<NaiveDateTime> {
    let s = timestamp_str.trim();
    if s.is_empty() {
        return None;
    }

    // ISO 8601 with offset (e.g. "2024-01-01T10:30:00Z" or "2024-01-01T10:30:00+03:00")
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc).naive_utc());
    }

    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive_dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive_dt);
        }
    }

    // Date only, midnight
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }

    // Anything without a year would be completed from the clock.
    if !has_year(s) {
        return None;
    }
    dateparser::parse_with(s, &Utc, NaiveTime::from_hms_opt(0, 0, 0)?)
        .ok()
        .map(|dt| dt.naive_utc())
}

/// True when `s` holds a run of at least four digits.
fn has_year(s: &str) -> bool {
    s.as_bytes()
        .split(|b| !b.is_ascii_digit())
        .any(|run| run.len() >= 4)
}

/// Null, absent and blank strings are missing; anything else must parse.
pub fn coerce_timestamp(value: Option<&Value>) -> Coerced {
    match value {
        None | Some(Value::Null) => Coerced::Missing,
        Some(Value::String(s)) if s.trim().is_empty() => Coerced::Missing,
        Some(Value::String(s)) => match parse_timestamp(s) {
            Some(ts) => Coerced::Parsed(ts),
            None => Coerced::Invalid(s.clone()),
        },
        Some(other) => Coerced::Invalid(other.to_string()),
    }
}

/// Renders a field as text; `None` when absent or null.
pub fn value_as_text(value: Option<&Value>) -> Option<String> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    }
}

/// Strips surrounding whitespace and lowercases.
pub fn normalize_text(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Canonical form of an identity field, used for dedup keys.
/// Absent and null collapse to the same key, as do `1` and `1.0`.
pub fn key_part(value: Option<&Value>) -> String {
    match value {
        None => Value::Null.to_string(),
        Some(Value::Number(n)) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => i.to_string(),
            (None, Some(f)) if f.fract() == 0.0 && f.abs() < 9.0e15 => (f as i64).to_string(),
            _ => n.to_string(),
        },
        Some(v) => v.to_string(),
    }
}
