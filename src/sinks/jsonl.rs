//! JSON-lines record store.
//!
//! Each accepted log becomes one line of JSON appended to a file. The file is
//! opened per write so external rotation is picked up without a restart.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::SinkError;

use super::traits::{LogRecord, RecordStore};

/// Default file name for the proximity log collection.
pub const DEFAULT_FILE_NAME: &str = "proximity_logs.jsonl";

/// Appends [`LogRecord`]s to a file, one JSON object per line.
#[derive(Debug)]
pub struct JsonlRecordStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlRecordStore {
    /// Creates a store writing to `path`. The file is created on first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Creates a store writing [`DEFAULT_FILE_NAME`] inside `dir`.
    #[must_use]
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(DEFAULT_FILE_NAME))
    }

    /// Target file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads every record back. Malformed lines are skipped.
    ///
    /// # Errors
    ///
    /// Returns `SinkError::Store` if the file cannot be read.
    pub fn read_all(&self) -> Result<Vec<LogRecord>, SinkError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(store_err(&self.path, &e)),
        };
        Ok(text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect())
    }
}

fn store_err(path: &Path, err: &dyn std::fmt::Display) -> SinkError {
    SinkError::Store {
        message: format!("{}: {err}", path.display()),
    }
}

impl RecordStore for JsonlRecordStore {
    fn append_record(&self, record: &LogRecord) -> Result<(), SinkError> {
        let mut line = serde_json::to_string(record).map_err(|e| store_err(&self.path, &e))?;
        line.push('\n');

        let _guard = self.write_lock.lock().map_err(|_| SinkError::Store {
            message: "poisoned lock: jsonl writer".to_string(),
        })?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| store_err(&self.path, &e))?;
        file.write_all(line.as_bytes()).map_err(|e| store_err(&self.path, &e))?;
        file.flush().map_err(|e| store_err(&self.path, &e))
    }
}
