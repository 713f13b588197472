use crate::error::{EtlError, Result};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// How an unparseable `scrape_timestamp` is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimestampPolicy {
    /// Abort the run.
    #[default]
    Strict,
    /// Store null, like `date`.
    Coerce,
}

impl FromStr for TimestampPolicy {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(TimestampPolicy::Strict),
            "coerce" => Ok(TimestampPolicy::Coerce),
            other => Err(EtlError::Config(format!(
                "unknown timestamp policy {other:?} (expected strict or coerce)"
            ))),
        }
    }
}

impl fmt::Display for TimestampPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimestampPolicy::Strict => f.write_str("strict"),
            TimestampPolicy::Coerce => f.write_str("coerce"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub source_dir: PathBuf,
    pub table_name: String,
    pub archive_subdir: String,
    pub batch_size: usize,
    pub timestamp_policy: TimestampPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("raw_data"),
            table_name: "raw_medical_data".to_string(),
            archive_subdir: "archive".to_string(),
            batch_size: 100,
            timestamp_policy: TimestampPolicy::Strict,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(EtlError::Config("batch size must be at least 1".into()));
        }
        if self.table_name.trim().is_empty() {
            return Err(EtlError::Config("table name must not be empty".into()));
        }
        if self.archive_subdir.trim().is_empty()
            || self.archive_subdir.contains(['/', '\\'])
        {
            return Err(EtlError::Config(format!(
                "archive directory must be a single path component, got {:?}",
                self.archive_subdir
            )));
        }
        Ok(())
    }

    pub fn archive_dir(&self) -> PathBuf {
        self.source_dir.join(&self.archive_subdir)
    }
}
