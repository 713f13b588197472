use chrono::NaiveDateTime;
use etl_core::domain::{CleanedRecord, CLEANED_COLUMNS};
use etl_core::error::EtlError;
use etl_core::ports::{Result, RowSink};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection};
use serde_json::Value;
use std::cell::{Ref, RefCell};
use std::path::PathBuf;
use tracing::{debug, info};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Highest bound-parameter count SQLite accepts in one statement.
const SQLITE_MAX_VARIABLES: usize = 32766;

/// Largest batch whose multi-row INSERT stays within `SQLITE_MAX_VARIABLES`.
pub const MAX_BATCH_SIZE: usize = SQLITE_MAX_VARIABLES / CLEANED_COLUMNS.len();

/// SQLite implementation of the RowSink trait.
///
/// The database file is opened on first use, so an unreachable database
/// surfaces as a write error rather than at construction.
pub struct SqliteRowSink {
    db_path: Option<PathBuf>,
    conn: RefCell<Option<Connection>>,
    batch_size: usize,
    init_schema: bool,
}

impl SqliteRowSink {
    /// Targets the database file at `db_path`; nothing is opened yet
    pub fn open(db_path: impl Into<PathBuf>, batch_size: usize) -> Result<Self> {
        check_batch_size(batch_size)?;
        Ok(Self {
            db_path: Some(db_path.into()),
            conn: RefCell::new(None),
            batch_size,
            init_schema: false,
        })
    }

    pub fn from_connection(conn: Connection, batch_size: usize) -> Result<Self> {
        check_batch_size(batch_size)?;
        Ok(Self {
            db_path: None,
            conn: RefCell::new(Some(conn)),
            batch_size,
            init_schema: false,
        })
    }

    /// Create the target table, if missing, at the start of every append.
    pub fn with_schema_init(mut self, init_schema: bool) -> Self {
        self.init_schema = init_schema;
        self
    }

    /// The live connection, opening the database file if needed.
    pub fn connection(&self) -> Result<Ref<'_, Connection>> {
        if self.conn.borrow().is_none() {
            let path = self
                .db_path
                .as_ref()
                .ok_or_else(|| EtlError::Config("no database path configured".into()))?;
            let conn = Connection::open(path).map_err(EtlError::storage)?;
            debug!(path = %path.display(), "Opened database");
            *self.conn.borrow_mut() = Some(conn);
        }
        Ref::filter_map(self.conn.borrow(), Option::as_ref)
            .map_err(|_| EtlError::Config("database connection missing".into()))
    }

    /// Creates the target table if it does not exist yet. Never alters an existing one.
    pub fn ensure_schema(&self, table_name: &str) -> Result<()> {
        let sql = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                message_id,
                channel,
                text              TEXT NOT NULL,
                media_path        TEXT NOT NULL,
                date              TEXT NOT NULL,
                scrape_timestamp  TEXT,
                text_clean        TEXT NOT NULL
            )
            "#,
            quote_identifier(table_name)
        );
        self.connection()?.execute_batch(&sql).map_err(EtlError::storage)?;
        info!(table = table_name, "Ensured target table exists");
        Ok(())
    }

    fn insert_sql(table_name: &str, rows: usize) -> String {
        let placeholders = format!("({})", vec!["?"; CLEANED_COLUMNS.len()].join(", "));
        format!(
            "INSERT INTO {} ({}) VALUES {}",
            quote_identifier(table_name),
            CLEANED_COLUMNS.join(", "),
            vec![placeholders; rows].join(", ")
        )
    }
}

fn check_batch_size(batch_size: usize) -> Result<()> {
    if batch_size == 0 || batch_size > MAX_BATCH_SIZE {
        return Err(EtlError::Config(format!(
            "batch size must be between 1 and {MAX_BATCH_SIZE}, got {batch_size}"
        )));
    }
    Ok(())
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn json_to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => n
                .as_f64()
                .map(SqlValue::Real)
                .unwrap_or_else(|| SqlValue::Text(n.to_string())),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

fn timestamp_to_sql(ts: &NaiveDateTime) -> SqlValue {
    SqlValue::Text(ts.format(TIMESTAMP_FORMAT).to_string())
}

/// Column values in `CLEANED_COLUMNS` order.
fn row_values(row: &CleanedRecord) -> [SqlValue; 7] {
    [
        json_to_sql(&row.message_id),
        json_to_sql(&row.channel),
        SqlValue::Text(row.text.clone()),
        SqlValue::Text(row.media_path.clone()),
        timestamp_to_sql(&row.date),
        row.scrape_timestamp
            .as_ref()
            .map(timestamp_to_sql)
            .unwrap_or(SqlValue::Null),
        SqlValue::Text(row.text_clean.clone()),
    ]
}

impl RowSink for SqliteRowSink {
    fn append_rows(&self, table_name: &str, rows: &[CleanedRecord]) -> Result<usize> {
        if rows.is_empty() {
            return Ok(0);
        }

        if self.init_schema {
            self.ensure_schema(table_name)?;
        }

        // All batches commit together; dropping the transaction on error rolls back.
        let conn = self.connection()?;
        let tx = conn.unchecked_transaction().map_err(EtlError::storage)?;
        let mut written = 0;
        for (i, chunk) in rows.chunks(self.batch_size).enumerate() {
            let sql = Self::insert_sql(table_name, chunk.len());
            let mut stmt = tx.prepare_cached(&sql).map_err(EtlError::storage)?;
            let values = chunk.iter().flat_map(row_values);
            written += stmt.execute(params_from_iter(values)).map_err(EtlError::storage)?;
            debug!(table = table_name, batch = i, rows = chunk.len(), "Inserted batch");
        }
        tx.commit().map_err(EtlError::storage)?;

        Ok(written)
    }
}
