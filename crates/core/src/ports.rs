use crate::domain::{ArchiveReport, CleanedRecord, LoadOutcome, ProcessedFileSet};

pub use crate::error::Result;

/// Produces the raw records for one run.
pub trait RecordSource {
    fn load(&self) -> Result<LoadOutcome>;
}

/// Narrow storage interface for the relational store.
/// Appends rows to an existing table and reports how many were written.
pub trait RowSink {
    fn append_rows(&self, table_name: &str, rows: &[CleanedRecord]) -> Result<usize>;
}

/// Moves processed source files out of the ingestion directory.
pub trait FileArchiver {
    fn archive(&self, files: &ProcessedFileSet) -> Result<ArchiveReport>;
}

impl<T: RowSink + ?Sized> RowSink for std::sync::Arc<T> {
    fn append_rows(&self, table_name: &str, rows: &[CleanedRecord]) -> Result<usize> {
        (**self).append_rows(table_name, rows)
    }
}
