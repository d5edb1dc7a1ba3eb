//! CLI command handlers
//!
//! This module contains the implementation of CLI commands, bridging the clap
//! argument parsing with the engines. Every handler returns the
//! [`CommandOutcome`](crate::error::CommandOutcome) the process exits with.

pub mod backup;
pub mod history;
pub mod lifecycle;
pub mod recover;

use crate::audit::AuditLogger;
use crate::backup::BackupEngine;
use crate::config::{Settings, StatekeeperPaths};
use crate::error::StateResult;
use crate::provisioner::LocalStateBackend;
use crate::recovery::RecoveryEngine;
use crate::store::{LocalObjectStore, Versioning};

pub use backup::{handle_backup, handle_list_backups, handle_list_snapshots, handle_prune};
pub use history::{handle_config, handle_history};
pub use lifecycle::{handle_lifecycle_command, LifecycleCommands};
pub use recover::{handle_force_unlock, handle_recover, handle_rollback};

/// Stores, backend and audit log wired from resolved paths and settings
pub struct Context {
    pub paths: StatekeeperPaths,
    pub settings: Settings,
    pub live: LocalObjectStore,
    pub backups: LocalObjectStore,
    pub backend: LocalStateBackend,
    pub audit: AuditLogger,
}

impl Context {
    /// Load settings (creating defaults on first run) and open both stores
    pub fn load(paths: StatekeeperPaths) -> StateResult<Self> {
        paths.ensure_directories()?;
        let first_run = !paths.settings_file().exists();
        let settings = Settings::load_or_create(&paths)?;
        if first_run {
            settings.save(&paths)?;
        }
        Ok(Self::from_settings(paths, settings))
    }

    pub fn from_settings(paths: StatekeeperPaths, settings: Settings) -> Self {
        let live = LocalObjectStore::open(settings.live_store_dir(&paths), Versioning::Enabled);
        let backups = LocalObjectStore::open(settings.backup_store_dir(&paths), Versioning::Disabled);
        let backend = LocalStateBackend::new(live.clone(), settings.operator.clone());
        let audit = AuditLogger::new(paths.audit_log());

        Self {
            paths,
            settings,
            live,
            backups,
            backend,
            audit,
        }
    }

    pub fn app(&self) -> &str {
        &self.settings.app_name
    }

    pub fn backup_engine(&self) -> BackupEngine<'_> {
        BackupEngine::new(self.app(), &self.live, &self.backups).with_audit(&self.audit)
    }

    pub fn recovery_engine(&self) -> RecoveryEngine<'_> {
        RecoveryEngine::new(self.app(), &self.live, &self.backups, &self.backend).with_audit(&self.audit)
    }
}

/// Format a duration in human-readable form
pub(crate) fn format_duration(duration: chrono::Duration) -> String {
    let total_seconds = duration.num_seconds().max(0);

    if total_seconds < 60 {
        return format!("{}s", total_seconds);
    }

    let minutes = total_seconds / 60;
    if minutes < 60 {
        return format!("{}m", minutes);
    }

    let hours = minutes / 60;
    if hours < 24 {
        return format!("{}h", hours);
    }

    let days = hours / 24;
    if days < 30 {
        return format!("{}d", days);
    }

    let months = days / 30;
    format!("{}mo", months)
}

/// Format a byte count in human-readable form
pub(crate) fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
