use crate::domain::CleanedRecord;
use crate::error::{EtlError, Result};
use crate::ports::RowSink;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

/// In-memory row sink for development and testing.
#[derive(Default)]
pub struct InMemoryRowSink {
    tables: Mutex<HashMap<String, Vec<CleanedRecord>>>,
    fail_with: Option<String>,
}

impl InMemoryRowSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose every append fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            tables: Mutex::new(HashMap::new()),
            fail_with: Some(message.into()),
        }
    }

    pub fn rows(&self, table_name: &str) -> Vec<CleanedRecord> {
        self.tables
            .lock()
            .map(|tables| tables.get(table_name).cloned().unwrap_or_default())
            .unwrap_or_default()
    }
}

impl RowSink for InMemoryRowSink {
    fn append_rows(&self, table_name: &str, rows: &[CleanedRecord]) -> Result<usize> {
        if let Some(message) = &self.fail_with {
            return Err(EtlError::Storage(message.clone().into()));
        }
        let mut tables = self
            .tables
            .lock()
            .map_err(|_| EtlError::Storage("in-memory sink lock poisoned".into()))?;
        tables
            .entry(table_name.to_string())
            .or_default()
            .extend_from_slice(rows);
        debug!(table = table_name, rows = rows.len(), "Appended rows in memory");
        Ok(rows.len())
    }
}
