use etl_core::domain::{LoadOutcome, RawRecord};
use etl_core::error::EtlError;
use etl_core::ports::{RecordSource, Result};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Reads every `*.json` file directly inside a directory.
pub struct JsonDirectorySource {
    source_dir: PathBuf,
}

impl JsonDirectorySource {
    pub fn new(source_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
        }
    }

    /// `.json` file names in the directory, sorted.
    fn json_files(&self) -> Result<Vec<String>> {
        let entries =
            fs::read_dir(&self.source_dir).map_err(|e| EtlError::io(&self.source_dir, e))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| EtlError::io(&self.source_dir, e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.ends_with(".json") {
                continue;
            }
            if !entry.path().is_file() {
                warn!(file = %name, "Skipping non-file entry");
                continue;
            }
            names.push(name);
        }
        names.sort();
        Ok(names)
    }
}

/// Parses one file as a JSON array of objects.
fn read_records(path: &Path, name: &str) -> Result<Vec<RawRecord>> {
    let raw = fs::read_to_string(path).map_err(|e| EtlError::io(path, e))?;
    let value: Value = serde_json::from_str(&raw)?;
    let Value::Array(items) = value else {
        return Err(EtlError::FileShape {
            file: name.to_string(),
            reason: "top level is not an array".into(),
        });
    };

    items
        .into_iter()
        .enumerate()
        .map(|(idx, item)| match item {
            Value::Object(record) => Ok(record),
            _ => Err(EtlError::FileShape {
                file: name.to_string(),
                reason: format!("element {idx} is not an object"),
            }),
        })
        .collect()
}

impl RecordSource for JsonDirectorySource {
    fn load(&self) -> Result<LoadOutcome> {
        let mut outcome = LoadOutcome::default();

        for name in self.json_files()? {
            let path = self.source_dir.join(&name);
            match read_records(&path, &name) {
                Ok(records) => {
                    info!(file = %name, records = records.len(), "Loaded {} records from {}", records.len(), name);
                    outcome.records.extend(records);
                    outcome.processed_files.insert(name);
                }
                Err(EtlError::Json(e)) => {
                    error!(file = %name, error = %e, "Invalid JSON format in {}", name);
                }
                Err(e) => {
                    error!(file = %name, error = %e, "Error loading {}", name);
                }
            }
        }

        Ok(outcome)
    }
}
