mod logging;

use anyhow::Context;
use clap::Parser;
use etl_core::ports::{FileArchiver, RecordSource, RowSink};
use etl_core::{PipelineConfig, PipelineService, TimestampPolicy};
use fs_adapter::{DirectoryArchiver, JsonDirectorySource};
use sqlite_adapter::SqliteRowSink;
use std::path::PathBuf;
use tracing::error;

/// Cleans scraped JSON messages and loads them into the warehouse table
#[derive(Parser, Debug)]
#[command(name = "scrape-etl")]
#[command(about = "Loads scraped JSON files, cleans them, appends them to SQLite and archives the sources")]
struct Cli {
    /// Directory holding the scraped *.json files
    #[arg(short = 's', long = "source-dir", env = "ETL_SOURCE_DIR", default_value = "raw_data")]
    source_dir: PathBuf,

    /// SQLite database file
    #[arg(short = 'd', long = "database", env = "ETL_DATABASE", default_value = "medical_dw.sqlite")]
    database: PathBuf,

    /// Target table
    #[arg(short = 't', long = "table", env = "ETL_TABLE", default_value = "raw_medical_data")]
    table: String,

    /// Log file, written alongside console output
    #[arg(long = "log-file", env = "ETL_LOG_FILE", default_value = "data_cleaning.log")]
    log_file: PathBuf,

    /// Rows per INSERT statement
    #[arg(long = "batch-size", env = "ETL_BATCH_SIZE", default_value_t = 100)]
    batch_size: usize,

    /// What to do with an unparseable scrape_timestamp: strict or coerce
    #[arg(long = "timestamp-policy", env = "ETL_TIMESTAMP_POLICY", default_value = "strict")]
    timestamp_policy: TimestampPolicy,

    /// Create the target table, if missing, when the write stage starts
    #[arg(long = "init-schema")]
    init_schema: bool,

    /// Load and clean only; nothing is written or archived
    #[arg(long = "dry-run")]
    dry_run: bool,
}

impl Cli {
    fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            source_dir: self.source_dir.clone(),
            table_name: self.table.clone(),
            batch_size: self.batch_size,
            timestamp_policy: self.timestamp_policy,
            ..PipelineConfig::default()
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = cli.pipeline_config();
    config.validate()?;

    // Instantiate concrete implementations of secondary adapters
    let source: Box<dyn RecordSource> = Box::new(JsonDirectorySource::new(&config.source_dir));
    let sink: Box<dyn RowSink> = Box::new(
        SqliteRowSink::open(&cli.database, config.batch_size)
            .with_context(|| format!("invalid database settings for {}", cli.database.display()))?
            .with_schema_init(cli.init_schema),
    );
    let archiver: Box<dyn FileArchiver> =
        Box::new(DirectoryArchiver::new(&config.source_dir, &config.archive_subdir));

    let service = PipelineService::new(source, sink, archiver, &config);
    if cli.dry_run {
        service.dry_run()?;
    } else {
        service.run()?;
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    let log_handle = match logging::init_logging(&cli.log_file) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Error initialising logging: {e:#}");
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&cli) {
        error!("Pipeline failed: {e:#}");
        // exit() skips destructors; flush the log file first
        drop(log_handle);
        std::process::exit(1);
    }
}
