//! Append-only JSONL audit log
//!
//! One JSON object per line. Each entry is serialized up front and written
//! with a single `write_all`, so a crash never leaves half an entry followed
//! by a valid one.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use tracing::warn;

use super::entry::AuditEntry;
use crate::environment::Environment;
use crate::error::{StateError, StateResult};

/// Writes and reads the audit log of every state-changing operation
#[derive(Debug, Clone)]
pub struct AuditLogger {
    log_path: PathBuf,
}

impl AuditLogger {
    pub fn new(log_path: PathBuf) -> Self {
        Self { log_path }
    }

    /// Append an entry, creating the log (and its directory) on first use
    pub fn log(&self, entry: &AuditEntry) -> StateResult<()> {
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');

        if let Some(parent) = self.log_path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_error("create directory for", e))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .map_err(|e| self.io_error("open", e))?;
        file.write_all(&line)
            .and_then(|_| file.flush())
            .map_err(|e| self.io_error("append to", e))
    }

    /// Log an entry, downgrading a logging failure to a warning
    ///
    /// Used by the engines: an audit write failure must never change the
    /// outcome of the state operation it describes.
    pub fn record(&self, entry: AuditEntry) {
        if let Err(e) = self.log(&entry) {
            warn!(error = %e, operation = %entry.operation, artifact = %entry.artifact, "audit log write failed");
        }
    }

    /// Every entry, oldest first
    pub fn read_all(&self) -> StateResult<Vec<AuditEntry>> {
        let file = match File::open(&self.log_path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io_error("open", e)),
        };

        let mut entries = Vec::new();
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| self.io_error("read", e))?;
            if line.trim().is_empty() {
                continue;
            }
            let entry = serde_json::from_str(&line).map_err(|e| {
                StateError::Json(format!(
                    "{} line {}: {}",
                    self.log_path.display(),
                    index + 1,
                    e
                ))
            })?;
            entries.push(entry);
        }
        Ok(entries)
    }

    /// The last `count` entries, optionally only those for one environment, oldest first
    pub fn read_recent(&self, count: usize, environment: Option<Environment>) -> StateResult<Vec<AuditEntry>> {
        let mut entries: Vec<AuditEntry> = self
            .read_all()?
            .into_iter()
            .filter(|e| environment.is_none() || e.environment == environment)
            .collect();
        let start = entries.len().saturating_sub(count);
        Ok(entries.split_off(start))
    }

    pub fn entry_count(&self) -> StateResult<usize> {
        Ok(self.read_all()?.len())
    }

    pub fn path(&self) -> &Path {
        &self.log_path
    }

    fn io_error(&self, action: &str, err: std::io::Error) -> StateError {
        StateError::Io(format!("Failed to {} audit log {}: {}", action, self.log_path.display(), err))
    }
}
