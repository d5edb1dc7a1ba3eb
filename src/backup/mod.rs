//! Backup system for statekeeper
//!
//! Captures the live provisioning state of one or more environments into
//! timestamped, immutable backup records and lists them back.
//!
//! # Architecture
//!
//! - `BackupEngine`: copies live state into the backup store, one
//!   environment at a time, isolating failures per environment
//! - `catalog`: lists backup records and safety snapshots, newest first
//! - `keys`: the key formats other tooling relies on
//! - `prune`: explicit deletion of a single named artifact
//!
//! # Backup Layout
//!
//! In the backup store:
//! - `backups/<app>-<environment>-<YYYYMMDD-HHMMSS>/default.tfstate`
//! - `safety/<app>-<environment>-pre-restore-<YYYYMMDD-HHMMSS>-<suffix>/default.tfstate`
//!
//! Only `backups/` is covered by retention rules.
//!
//! # Example
//!
//! ```rust,ignore
//! use statekeeper::backup::BackupEngine;
//!
//! let engine = BackupEngine::new("shop", &live_store, &backup_store).with_audit(&audit);
//! let result = engine.backup(&[]);
//! std::process::exit(result.outcome().exit_code());
//! ```

mod catalog;
mod engine;
pub mod keys;
mod prune;

pub use catalog::{list_backups, list_safety_snapshots, BackupRecord, SafetySnapshot};
pub use engine::{BackupEngine, BackupResult, BackupStatus, EnvironmentBackup};
pub use keys::{BACKUP_PREFIX, SAFETY_PREFIX};
pub use prune::{prune_artifact, resolve_artifact, ArtifactKind, PrunedArtifact};
