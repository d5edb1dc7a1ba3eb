//! Listing backup records and safety snapshots

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::keys::{
    key_from_object, parse_backup_key, parse_safety_snapshot_key, BACKUP_PREFIX, SAFETY_PREFIX,
};
use crate::environment::Environment;
use crate::error::StateResult;
use crate::store::ObjectStore;

/// An immutable copy of one environment's live state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupRecord {
    pub environment: Environment,
    /// `<app>-<environment>-<YYYYMMDD-HHMMSS>`
    pub key: String,
    pub captured_at: DateTime<Utc>,
    pub size_bytes: u64,
    /// Where the record is stored
    pub location: String,
}

/// Copy of live state taken automatically before a restore overwrote it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SafetySnapshot {
    pub environment: Environment,
    /// `<app>-<environment>-pre-restore-<YYYYMMDD-HHMMSS>-<suffix>`
    pub key: String,
    pub taken_at: DateTime<Utc>,
    pub size_bytes: u64,
    pub location: String,
}

/// All backup records of `env`, newest first
///
/// Objects under the environment's prefix whose key does not parse are
/// skipped rather than failing the listing.
pub fn list_backups(
    store: &dyn ObjectStore,
    app: &str,
    env: Environment,
) -> StateResult<Vec<BackupRecord>> {
    let prefix = format!("{}{}", BACKUP_PREFIX, env.key_prefix(app));
    let mut records: Vec<BackupRecord> = store
        .list(&prefix)?
        .into_iter()
        .filter_map(|meta| {
            let key = key_from_object(BACKUP_PREFIX, &meta.key)?;
            let captured_at = parse_backup_key(app, env, key)?;
            Some(BackupRecord {
                environment: env,
                key: key.to_string(),
                captured_at,
                size_bytes: meta.size_bytes,
                location: store.location(&meta.key),
            })
        })
        .collect();

    records.sort_by(|a, b| b.captured_at.cmp(&a.captured_at).then_with(|| b.key.cmp(&a.key)));
    Ok(records)
}

/// All safety snapshots of `env`, newest first
pub fn list_safety_snapshots(
    store: &dyn ObjectStore,
    app: &str,
    env: Environment,
) -> StateResult<Vec<SafetySnapshot>> {
    let prefix = format!("{}{}", SAFETY_PREFIX, env.key_prefix(app));
    let mut snapshots: Vec<SafetySnapshot> = store
        .list(&prefix)?
        .into_iter()
        .filter_map(|meta| {
            let key = key_from_object(SAFETY_PREFIX, &meta.key)?;
            let taken_at = parse_safety_snapshot_key(app, env, key)?;
            Some(SafetySnapshot {
                environment: env,
                key: key.to_string(),
                taken_at,
                size_bytes: meta.size_bytes,
                location: store.location(&meta.key),
            })
        })
        .collect();

    snapshots.sort_by(|a, b| b.taken_at.cmp(&a.taken_at).then_with(|| b.key.cmp(&a.key)));
    Ok(snapshots)
}
