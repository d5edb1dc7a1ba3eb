//! User settings for statekeeper
//!
//! Manages the application name that prefixes every namespace and backup key,
//! store locations, the operator identity recorded in state locks, and the
//! retention rules for both stores.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::paths::StatekeeperPaths;
use crate::error::StateError;
use crate::store::file_io::write_json_atomic;

/// Retention for the live-state store: optimized for undoing the last mistake
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveRetention {
    /// Number of non-current versions to keep per object
    pub max_noncurrent_versions: u32,
    /// Non-current versions older than this many days are deleted
    pub noncurrent_age_days: u32,
}

impl Default for LiveRetention {
    fn default() -> Self {
        Self {
            max_noncurrent_versions: 5,
            noncurrent_age_days: 30,
        }
    }
}

/// Retention for the backup store: age-based only
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupRetention {
    /// Backups older than this many days are deleted
    pub age_days: u32,
}

impl Default for BackupRetention {
    fn default() -> Self {
        Self { age_days: 90 }
    }
}

/// User settings for statekeeper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Application name used in namespaces and backup keys
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Override for the live-state store root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub live_store_dir: Option<PathBuf>,

    /// Override for the backup store root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_store_dir: Option<PathBuf>,

    /// Name recorded as the holder of state locks
    #[serde(default = "default_operator")]
    pub operator: String,

    /// Live-state retention policy
    #[serde(default)]
    pub live_retention: LiveRetention,

    /// Backup retention policy
    #[serde(default)]
    pub backup_retention: BackupRetention,
}

fn default_schema_version() -> u32 {
    1
}

fn default_app_name() -> String {
    "app".to_string()
}

fn default_operator() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            app_name: default_app_name(),
            live_store_dir: None,
            backup_store_dir: None,
            operator: default_operator(),
            live_retention: LiveRetention::default(),
            backup_retention: BackupRetention::default(),
        }
    }
}

impl Settings {
    /// Load settings from disk, or create default settings if file doesn't exist
    pub fn load_or_create(paths: &StatekeeperPaths) -> Result<Self, StateError> {
        let settings_path = paths.settings_file();

        let settings = if settings_path.exists() {
            let contents = std::fs::read_to_string(&settings_path).map_err(|e| {
                StateError::Io(format!("Failed to read settings file: {}", e))
            })?;

            serde_json::from_str::<Settings>(&contents).map_err(|e| {
                StateError::Config(format!("Failed to parse settings file: {}", e))
            })?
        } else {
            // Don't save yet - let caller decide when to persist
            Settings::default()
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Save settings to disk
    pub fn save(&self, paths: &StatekeeperPaths) -> Result<(), StateError> {
        paths.ensure_directories()?;
        write_json_atomic(paths.settings_file(), self)
    }

    /// Reject settings that would produce ambiguous namespaces or keys
    pub fn validate(&self) -> Result<(), StateError> {
        if self.app_name.is_empty() {
            return Err(StateError::Config("app_name must not be empty".into()));
        }
        if !self
            .app_name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(StateError::Config(format!(
                "app_name '{}' may only contain ASCII letters, digits, '-' and '_'",
                self.app_name
            )));
        }
        if self.backup_retention.age_days == 0 {
            return Err(StateError::Config(
                "backup_retention.age_days must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Resolved live-state store root
    pub fn live_store_dir(&self, paths: &StatekeeperPaths) -> PathBuf {
        self.live_store_dir
            .clone()
            .unwrap_or_else(|| paths.live_store_dir())
    }

    /// Resolved backup store root
    pub fn backup_store_dir(&self, paths: &StatekeeperPaths) -> PathBuf {
        self.backup_store_dir
            .clone()
            .unwrap_or_else(|| paths.backup_store_dir())
    }
}
