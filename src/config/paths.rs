//! Path management for statekeeper
//!
//! Resolves where settings, the audit log and the local store roots live.
//!
//! ## Path Resolution Order
//!
//! 1. `STATEKEEPER_HOME` environment variable (if set)
//! 2. The platform data directory from `directories::ProjectDirs`
//!    (e.g. `~/.local/share/statekeeper` on Linux)

use std::path::PathBuf;

use directories::ProjectDirs;

use crate::error::StateError;

/// Environment variable overriding the base directory
pub const HOME_ENV: &str = "STATEKEEPER_HOME";

/// Manages all paths used by statekeeper
#[derive(Debug, Clone)]
pub struct StatekeeperPaths {
    /// Base directory for all statekeeper data
    base_dir: PathBuf,
}

impl StatekeeperPaths {
    /// Create a new StatekeeperPaths instance
    ///
    /// # Errors
    ///
    /// Returns an error if no home directory can be determined.
    pub fn new() -> Result<Self, StateError> {
        match std::env::var_os(HOME_ENV) {
            Some(custom) if !custom.is_empty() => Ok(Self::with_base_dir(PathBuf::from(custom))),
            _ => resolve_default_path().map(Self::with_base_dir),
        }
    }

    /// Create StatekeeperPaths with a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the path to the settings file
    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Get the path to the audit log
    pub fn audit_log(&self) -> PathBuf {
        self.base_dir.join("audit.log")
    }

    /// Default root of the live-state store
    pub fn live_store_dir(&self) -> PathBuf {
        self.base_dir.join("live")
    }

    /// Default root of the backup store
    pub fn backup_store_dir(&self) -> PathBuf {
        self.base_dir.join("backups")
    }

    /// Ensure the base directory exists
    pub fn ensure_directories(&self) -> Result<(), StateError> {
        std::fs::create_dir_all(&self.base_dir)
            .map_err(|e| StateError::Io(format!("Failed to create base directory: {}", e)))?;
        Ok(())
    }
}

fn resolve_default_path() -> Result<PathBuf, StateError> {
    ProjectDirs::from("", "", "statekeeper")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| StateError::Config("Could not determine a home directory".into()))
}
