//! Deterministic cleaning of the merged record table.
//!
//! Steps run in a fixed order: dedup, fill missing values, parse dates,
//! normalize text, validate. Later steps read what earlier ones wrote.

use crate::config::TimestampPolicy;
use crate::domain::{CleanReport, CleanedRecord, RawRecord, RecordTable, MEDIA_PATH_MISSING};
use crate::error::{EtlError, Result};
use crate::utils::{coerce_timestamp, key_part, normalize_text, value_as_text, Coerced};
use chrono::NaiveDateTime;
use serde_json::Value;
use std::collections::HashMap;
use tracing::info;

/// A row after date coercion, before validation.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedRow {
    pub message_id: Value,
    pub channel: Value,
    pub text: String,
    pub media_path: String,
    pub date: Option<NaiveDateTime>,
    pub scrape_timestamp: Option<NaiveDateTime>,
    pub text_clean: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Cleaner {
    timestamp_policy: TimestampPolicy,
}

impl Cleaner {
    pub fn new(timestamp_policy: TimestampPolicy) -> Self {
        Self { timestamp_policy }
    }

    pub fn clean(&self, table: RecordTable) -> Result<(Vec<CleanedRecord>, CleanReport)> {
        let mut report = CleanReport {
            input: table.len(),
            ..CleanReport::default()
        };

        let mut table = deduplicate(table);
        report.after_dedup = table.len();
        info!(rows = table.len(), "Removed duplicates, remaining records: {}", table.len());

        fill_missing(&mut table);
        info!(rows = table.len(), "Handled missing values");

        let mut rows = parse_dates(table, self.timestamp_policy)?;
        report.invalid_dates = rows.iter().filter(|r| r.date.is_none()).count();
        info!(rows = rows.len(), invalid_dates = report.invalid_dates, "Standardized date formats");

        normalize(&mut rows);
        info!(rows = rows.len(), "Cleaned text data");

        let before = rows.len();
        let cleaned = validate(rows);
        report.dropped_invalid = before - cleaned.len();
        report.output = cleaned.len();
        info!(
            dropped = report.dropped_invalid,
            "Applied validation, remaining records: {}",
            cleaned.len()
        );

        Ok((cleaned, report))
    }
}

/// Keeps the last occurrence of every (`message_id`, `channel`) pair.
/// Surviving rows stay in their original relative order.
pub fn deduplicate(table: RecordTable) -> RecordTable {
    let key = |record: &RawRecord| {
        (
            key_part(record.get("message_id")),
            key_part(record.get("channel")),
        )
    };

    let mut last_seen: HashMap<(String, String), usize> = HashMap::with_capacity(table.len());
    for (idx, record) in table.iter().enumerate() {
        last_seen.insert(key(record), idx);
    }

    table
        .into_iter()
        .enumerate()
        .filter(|(idx, record)| last_seen.get(&key(record)) == Some(idx))
        .map(|(_, record)| record)
        .collect()
}

/// Absent or null `text` becomes "", absent or null `media_path` becomes "N/A".
/// Non-string values are rendered as JSON text.
pub fn fill_missing(table: &mut RecordTable) {
    for record in table.iter_mut() {
        let text = value_as_text(record.get("text")).unwrap_or_default();
        let media_path = value_as_text(record.get("media_path"))
            .unwrap_or_else(|| MEDIA_PATH_MISSING.to_string());
        record.insert("text".into(), Value::String(text));
        record.insert("media_path".into(), Value::String(media_path));
    }
}

/// Unparseable `date` becomes null. Unparseable `scrape_timestamp` follows the policy.
pub fn parse_dates(table: RecordTable, policy: TimestampPolicy) -> Result<Vec<StagedRow>> {
    table
        .into_iter()
        .enumerate()
        .map(|(row, mut record)| {
            let date = match coerce_timestamp(record.get("date")) {
                Coerced::Parsed(ts) => Some(ts),
                Coerced::Missing | Coerced::Invalid(_) => None,
            };
            let scrape_timestamp = match coerce_timestamp(record.get("scrape_timestamp")) {
                Coerced::Parsed(ts) => Some(ts),
                Coerced::Missing => None,
                Coerced::Invalid(value) => match policy {
                    TimestampPolicy::Strict => return Err(EtlError::Timestamp { row, value }),
                    TimestampPolicy::Coerce => None,
                },
            };

            Ok(StagedRow {
                message_id: record.remove("message_id").unwrap_or(Value::Null),
                channel: record.remove("channel").unwrap_or(Value::Null),
                text: value_as_text(record.get("text")).unwrap_or_default(),
                media_path: value_as_text(record.get("media_path"))
                    .unwrap_or_else(|| MEDIA_PATH_MISSING.to_string()),
                date,
                scrape_timestamp,
                text_clean: String::new(),
            })
        })
        .collect()
}

pub fn normalize(rows: &mut [StagedRow]) {
    for row in rows.iter_mut() {
        row.text_clean = normalize_text(&row.text);
    }
}

/// Keeps rows with a date and non-empty normalized text.
pub fn validate(rows: Vec<StagedRow>) -> Vec<CleanedRecord> {
    rows.into_iter()
        .filter_map(|row| {
            let date = row.date?;
            if row.text_clean.is_empty() {
                return None;
            }
            Some(CleanedRecord {
                message_id: row.message_id,
                channel: row.channel,
                text: row.text,
                media_path: row.media_path,
                date,
                scrape_timestamp: row.scrape_timestamp,
                text_clean: row.text_clean,
            })
        })
        .collect()
}
