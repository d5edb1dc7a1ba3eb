//! Atomic file writes and tolerant JSON reads
//!
//! Object content, object indexes and lifecycle rules all go through
//! [`write_bytes_atomic`]: the bytes land in a temp file next to the target,
//! are synced, then renamed over it. A reader sees the old file or the new
//! one, never a partial write.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{StateError, StateResult};

/// Read JSON from `path`; a missing file yields `T::default()`
pub fn read_json<T, P>(path: P) -> StateResult<T>
where
    T: DeserializeOwned + Default,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(T::default()),
        Err(e) => return Err(StateError::transient(path.display().to_string(), e)),
    };
    serde_json::from_slice(&bytes)
        .map_err(|e| StateError::Json(format!("Failed to parse {}: {}", path.display(), e)))
}

/// Serialize `data` as pretty JSON and write it atomically
pub fn write_json_atomic<T, P>(path: P, data: &T) -> StateResult<()>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let bytes = serde_json::to_vec_pretty(data)?;
    write_bytes_atomic(path, &bytes)
}

/// Replace the file at `path` with `data` in one rename
pub fn write_bytes_atomic<P: AsRef<Path>>(path: P, data: &[u8]) -> StateResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| StateError::transient(parent.display().to_string(), e))?;
    }

    // Same directory as the target, or the rename is not atomic
    let temp_path = temp_path_for(path);
    let result = File::create(&temp_path)
        .and_then(|mut file| {
            file.write_all(data)?;
            file.sync_all()
        })
        .and_then(|_| fs::rename(&temp_path, path));

    result.map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        StateError::transient(path.display().to_string(), e)
    })
}

/// `<name>.<pid>.tmp`, so two processes never share a temp file
fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(format!(".{}.tmp", std::process::id()));
    path.with_file_name(name)
}
