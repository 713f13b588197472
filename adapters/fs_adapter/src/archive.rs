use etl_core::domain::{ArchiveReport, ProcessedFileSet};
use etl_core::error::EtlError;
use etl_core::ports::{FileArchiver, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Moves processed files into `<source_dir>/<archive_subdir>/`, keeping names.
pub struct DirectoryArchiver {
    source_dir: PathBuf,
    archive_dir: PathBuf,
}

impl DirectoryArchiver {
    pub fn new(source_dir: impl Into<PathBuf>, archive_subdir: &str) -> Self {
        let source_dir = source_dir.into();
        let archive_dir = source_dir.join(archive_subdir);
        Self {
            source_dir,
            archive_dir,
        }
    }

    pub fn archive_dir(&self) -> &Path {
        &self.archive_dir
    }
}

/// Rename, falling back to copy+remove across filesystems.
fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::CrossesDevices => {
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
        Err(e) => Err(e),
    }
}

impl FileArchiver for DirectoryArchiver {
    fn archive(&self, files: &ProcessedFileSet) -> Result<ArchiveReport> {
        fs::create_dir_all(&self.archive_dir).map_err(|e| EtlError::io(&self.archive_dir, e))?;

        let mut report = ArchiveReport::default();
        for name in files {
            let src = self.source_dir.join(name);
            let dest = self.archive_dir.join(name);
            match move_file(&src, &dest) {
                Ok(()) => {
                    info!(file = %name, "Archived {}", name);
                    report.archived.push(name.clone());
                }
                Err(source) => {
                    let err = EtlError::Archive {
                        file: name.clone(),
                        source,
                    };
                    error!(file = %name, error = %err, "Archive move failed");
                    report.failed.push(name.clone());
                }
            }
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn set(names: &[&str]) -> ProcessedFileSet {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_moves_files_into_archive() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.json"), "[]").unwrap();
        fs::write(dir.path().join("b.json"), "[1]").unwrap();
        let archiver = DirectoryArchiver::new(dir.path(), "archive");

        let report = archiver.archive(&set(&["a.json", "b.json"])).unwrap();

        assert_eq!(report.archived, vec!["a.json".to_string(), "b.json".to_string()]);
        assert!(report.failed.is_empty());
        for name in ["a.json", "b.json"] {
            assert!(!dir.path().join(name).exists());
            assert!(dir.path().join("archive").join(name).exists());
        }
        assert_eq!(fs::read_to_string(dir.path().join("archive/b.json")).unwrap(), "[1]");
    }

    #[test]
    fn test_missing_file_does_not_stop_the_rest() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("z.json"), "[]").unwrap();
        let archiver = DirectoryArchiver::new(dir.path(), "archive");

        let report = archiver.archive(&set(&["gone.json", "z.json"])).unwrap();

        assert_eq!(report.failed, vec!["gone.json".to_string()]);
        assert_eq!(report.archived, vec!["z.json".to_string()]);
        assert!(archiver.archive_dir().join("z.json").exists());
    }

    #[test]
    fn test_creates_archive_dir_even_when_nothing_to_move() {
        let dir = TempDir::new().unwrap();
        let archiver = DirectoryArchiver::new(dir.path(), "archive");

        let report = archiver.archive(&ProcessedFileSet::new()).unwrap();

        assert_eq!(report, ArchiveReport::default());
        assert!(dir.path().join("archive").is_dir());
    }

    #[test]
    fn test_untracked_files_stay_put() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.json"), "[]").unwrap();
        fs::write(dir.path().join("bad.json"), "[").unwrap();
        let archiver = DirectoryArchiver::new(dir.path(), "archive");

        archiver.archive(&set(&["a.json"])).unwrap();

        assert!(dir.path().join("bad.json").exists());
        assert!(!dir.path().join("archive/bad.json").exists());
    }
}
