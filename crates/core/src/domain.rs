use chrono::NaiveDateTime;
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// One scraped entry exactly as it was parsed from a source file.
pub type RawRecord = Map<String, Value>;

/// All raw records of one run, in ingestion order.
pub type RecordTable = Vec<RawRecord>;

/// Names of the source files that parsed successfully during this run.
pub type ProcessedFileSet = BTreeSet<String>;

/// Placeholder stored when a record carries no media.
pub const MEDIA_PATH_MISSING: &str = "N/A";

/// Column order used by every writer.
pub const CLEANED_COLUMNS: [&str; 7] = [
    "message_id",
    "channel",
    "text",
    "media_path",
    "date",
    "scrape_timestamp",
    "text_clean",
];

#[derive(Debug, Clone, PartialEq)]
pub struct CleanedRecord {
    pub message_id: Value,
    pub channel: Value,
    pub text: String,
    pub media_path: String,
    pub date: NaiveDateTime,
    pub scrape_timestamp: Option<NaiveDateTime>,
    pub text_clean: String,
}

/// Result of reading the source directory.
#[derive(Debug, Clone, Default)]
pub struct LoadOutcome {
    pub records: RecordTable,
    pub processed_files: ProcessedFileSet,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveReport {
    pub archived: Vec<String>,
    pub failed: Vec<String>,
}

/// Row counts after each cleaning step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanReport {
    pub input: usize,
    pub after_dedup: usize,
    pub invalid_dates: usize,
    pub dropped_invalid: usize,
    pub output: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Written(usize),
    Skipped,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub files_loaded: usize,
    pub raw_records: usize,
    pub clean: CleanReport,
    pub write: WriteOutcome,
    pub archive: Option<ArchiveReport>,
}
