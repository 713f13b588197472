use crate::cleaner::Cleaner;
use crate::config::PipelineConfig;
use crate::domain::{ArchiveReport, CleanedRecord, RunSummary, WriteOutcome};
use crate::ports::{FileArchiver, RecordSource, Result, RowSink};
use std::fmt;
use tracing::{error, info, warn};

/// Pipeline stages, always visited in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Load,
    Clean,
    Write,
    Archive,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Load => "load",
            Stage::Clean => "clean",
            Stage::Write => "write",
            Stage::Archive => "archive",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Application service sequencing load, clean, write and archive.
pub struct PipelineService {
    source: Box<dyn RecordSource>,
    sink: Box<dyn RowSink>,
    archiver: Box<dyn FileArchiver>,
    cleaner: Cleaner,
    table_name: String,
}

impl PipelineService {
    /// Creates a new PipelineService with the given dependencies
    pub fn new(
        source: Box<dyn RecordSource>,
        sink: Box<dyn RowSink>,
        archiver: Box<dyn FileArchiver>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            source,
            sink,
            archiver,
            cleaner: Cleaner::new(config.timestamp_policy),
            table_name: config.table_name.clone(),
        }
    }

    /// Runs every stage. Errors from load and clean abort the run; write
    /// errors are logged and the run still archives.
    pub fn run(&self) -> Result<RunSummary> {
        self.execute(false)
    }

    /// Loads and cleans only. Nothing is written or moved.
    pub fn dry_run(&self) -> Result<RunSummary> {
        self.execute(true)
    }

    fn execute(&self, dry_run: bool) -> Result<RunSummary> {
        info!("Starting data cleaning pipeline");

        let loaded = self.stage(Stage::Load, || self.source.load())?;
        info!(rows = loaded.records.len(), "Loaded {} raw records", loaded.records.len());
        let files_loaded = loaded.processed_files.len();
        let raw_records = loaded.records.len();

        let (cleaned, clean) = self.stage(Stage::Clean, || self.cleaner.clean(loaded.records))?;
        info!(rows = cleaned.len(), "Cleaned data contains {} records", cleaned.len());

        if dry_run {
            info!(files = files_loaded, "Dry run: skipping write and archive");
            return Ok(RunSummary {
                files_loaded,
                raw_records,
                clean,
                write: WriteOutcome::Skipped,
                archive: None,
            });
        }

        let write = self.write(&cleaned);
        let archive = self.stage(Stage::Archive, || self.archiver.archive(&loaded.processed_files))?;
        self.log_archive(&archive);

        info!(stage = %Stage::Done, "Data cleaning pipeline completed successfully");
        Ok(RunSummary {
            files_loaded,
            raw_records,
            clean,
            write,
            archive: Some(archive),
        })
    }

    fn stage<T>(&self, stage: Stage, f: impl FnOnce() -> Result<T>) -> Result<T> {
        f().map_err(|e| {
            error!(stage = %stage, error = %e, "Pipeline aborted");
            e
        })
    }

    fn write(&self, rows: &[CleanedRecord]) -> WriteOutcome {
        if rows.is_empty() {
            info!(stage = %Stage::Write, "No records to load");
            return WriteOutcome::Skipped;
        }
        match self.sink.append_rows(&self.table_name, rows) {
            Ok(n) => {
                info!(table = %self.table_name, rows = n, "Successfully loaded {} records to database", n);
                WriteOutcome::Written(n)
            }
            Err(e) => {
                error!(table = %self.table_name, error = %e, "Database insertion failed");
                WriteOutcome::Failed(e.to_string())
            }
        }
    }

    fn log_archive(&self, report: &ArchiveReport) {
        if report.failed.is_empty() {
            info!(files = report.archived.len(), "Archived {} files", report.archived.len());
        } else {
            warn!(
                archived = report.archived.len(),
                failed = report.failed.len(),
                "Archived {} files, {} could not be moved",
                report.archived.len(),
                report.failed.len()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LoadOutcome, ProcessedFileSet};
    use crate::error::EtlError;
    use crate::memory::InMemoryRowSink;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    struct FixedSource(serde_json::Value, Vec<&'static str>);

    impl RecordSource for FixedSource {
        fn load(&self) -> Result<LoadOutcome> {
            Ok(LoadOutcome {
                records: serde_json::from_value(self.0.clone())?,
                processed_files: self.1.iter().map(|s| s.to_string()).collect(),
            })
        }
    }

    struct BrokenSource;

    impl RecordSource for BrokenSource {
        fn load(&self) -> Result<LoadOutcome> {
            Err(EtlError::Config("no source".into()))
        }
    }

    #[derive(Default, Clone)]
    struct RecordingArchiver(Arc<Mutex<Vec<ProcessedFileSet>>>);

    impl FileArchiver for RecordingArchiver {
        fn archive(&self, files: &ProcessedFileSet) -> Result<ArchiveReport> {
            self.0.lock().unwrap().push(files.clone());
            Ok(ArchiveReport {
                archived: files.iter().cloned().collect(),
                failed: Vec::new(),
            })
        }
    }

    fn records() -> serde_json::Value {
        json!([
            {"message_id": 1, "channel": "x", "text": " Hello ", "date": "2024-01-01", "scrape_timestamp": "2024-01-01T00:00:00"},
            {"message_id": 1, "channel": "x", "text": "World", "date": "2024-01-02", "scrape_timestamp": "2024-01-02T00:00:00"},
            {"message_id": 2, "channel": "x", "text": "dropped", "date": "not-a-date", "scrape_timestamp": "2024-01-02T00:00:00"}
        ])
    }

    fn service(
        source: impl RecordSource + 'static,
        sink: Arc<InMemoryRowSink>,
        archiver: RecordingArchiver,
    ) -> PipelineService {
        PipelineService::new(
            Box::new(source),
            Box::new(sink),
            Box::new(archiver),
            &PipelineConfig::default(),
        )
    }

    #[test]
    fn test_run_writes_cleaned_rows_and_archives() {
        let sink = Arc::new(InMemoryRowSink::new());
        let archiver = RecordingArchiver::default();
        let svc = service(FixedSource(records(), vec!["a.json"]), sink.clone(), archiver.clone());

        let summary = svc.run().unwrap();

        let rows: Vec<CleanedRecord> = sink.rows("raw_medical_data");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].text_clean, "world");
        assert_eq!(summary.raw_records, 3);
        assert_eq!(summary.clean.output, 1);
        assert_eq!(summary.write, WriteOutcome::Written(1));
        assert_eq!(archiver.0.lock().unwrap().len(), 1);
        assert_eq!(summary.archive.unwrap().archived, vec!["a.json".to_string()]);
    }

    #[test]
    fn test_write_failure_still_archives() {
        let sink = Arc::new(InMemoryRowSink::failing("connection refused"));
        let archiver = RecordingArchiver::default();
        let svc = service(FixedSource(records(), vec!["a.json"]), sink, archiver.clone());

        let summary = svc.run().unwrap();

        assert!(matches!(summary.write, WriteOutcome::Failed(ref m) if m.contains("connection refused")));
        assert_eq!(archiver.0.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_load_failure_aborts_before_write_and_archive() {
        let sink = Arc::new(InMemoryRowSink::new());
        let archiver = RecordingArchiver::default();
        let svc = service(BrokenSource, sink.clone(), archiver.clone());

        assert!(svc.run().is_err());
        assert!(sink.rows("raw_medical_data").is_empty());
        assert!(archiver.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_clean_failure_aborts_before_archive() {
        let bad = json!([
            {"message_id": 1, "channel": "x", "text": "a", "date": "2024-01-01", "scrape_timestamp": "never"}
        ]);
        let sink = Arc::new(InMemoryRowSink::new());
        let archiver = RecordingArchiver::default();
        let svc = service(FixedSource(bad, vec!["a.json"]), sink.clone(), archiver.clone());

        assert!(matches!(svc.run(), Err(EtlError::Timestamp { .. })));
        assert!(archiver.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_dry_run_leaves_sink_and_files_alone() {
        let sink = Arc::new(InMemoryRowSink::new());
        let archiver = RecordingArchiver::default();
        let svc = service(FixedSource(records(), vec!["a.json"]), sink.clone(), archiver.clone());

        let summary = svc.dry_run().unwrap();

        assert_eq!(summary.write, WriteOutcome::Skipped);
        assert!(summary.archive.is_none());
        assert!(sink.rows("raw_medical_data").is_empty());
        assert!(archiver.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_empty_input_skips_write_but_archives() {
        let sink = Arc::new(InMemoryRowSink::failing("should not be called"));
        let archiver = RecordingArchiver::default();
        let svc = service(FixedSource(json!([]), vec!["empty.json"]), sink, archiver.clone());

        let summary = svc.run().unwrap();

        assert_eq!(summary.write, WriteOutcome::Skipped);
        assert_eq!(archiver.0.lock().unwrap()[0].len(), 1);
    }
}
