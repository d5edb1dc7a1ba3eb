//! Backup and safety-snapshot key formats
//!
//! Backup keys are `<app>-<environment>-<YYYYMMDD-HHMMSS>` (UTC). Other
//! tooling parses them to present chronological listings, so the format is a
//! contract. Safety snapshot keys add a `pre-restore` marker and a random
//! suffix so two recoveries in the same second never share a snapshot.

use chrono::{DateTime, NaiveDateTime, Timelike, Utc};

use crate::environment::Environment;
use crate::store::STATE_OBJECT;

/// Backup-store prefix holding backup records (covered by retention)
pub const BACKUP_PREFIX: &str = "backups/";

/// Backup-store prefix holding safety snapshots (never expires)
pub const SAFETY_PREFIX: &str = "safety/";

const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";
const TIMESTAMP_LEN: usize = 15;
const SAFETY_MARKER: &str = "pre-restore-";

/// Truncate to the second granularity used in keys
pub fn truncate_to_second(at: DateTime<Utc>) -> DateTime<Utc> {
    at.with_nanosecond(0).unwrap_or(at)
}

/// `<app>-<environment>-<YYYYMMDD-HHMMSS>`
pub fn backup_key(app: &str, env: Environment, at: DateTime<Utc>) -> String {
    format!("{}{}", env.key_prefix(app), at.format(TIMESTAMP_FORMAT))
}

/// Capture time of a backup key belonging to `app`/`env`
pub fn parse_backup_key(app: &str, env: Environment, key: &str) -> Option<DateTime<Utc>> {
    key.strip_prefix(&env.key_prefix(app))
        .and_then(parse_timestamp)
}

/// `<app>-<environment>-pre-restore-<YYYYMMDD-HHMMSS>-<suffix>`
pub fn safety_snapshot_key(app: &str, env: Environment, at: DateTime<Utc>, suffix: &str) -> String {
    format!(
        "{}{}{}-{}",
        env.key_prefix(app),
        SAFETY_MARKER,
        at.format(TIMESTAMP_FORMAT),
        suffix
    )
}

/// Creation time of a safety snapshot key belonging to `app`/`env`
pub fn parse_safety_snapshot_key(app: &str, env: Environment, key: &str) -> Option<DateTime<Utc>> {
    let rest = key
        .strip_prefix(&env.key_prefix(app))?
        .strip_prefix(SAFETY_MARKER)?;
    let timestamp = rest.get(..TIMESTAMP_LEN)?;
    let suffix = rest.get(TIMESTAMP_LEN..)?;
    if !suffix.starts_with('-') || suffix.len() < 2 {
        return None;
    }
    parse_timestamp(timestamp)
}

/// Backup-store object holding a backup record
pub fn backup_object_key(backup_key: &str) -> String {
    format!("{}{}/{}", BACKUP_PREFIX, backup_key, STATE_OBJECT)
}

/// Backup-store object holding a safety snapshot
pub fn safety_object_key(snapshot_key: &str) -> String {
    format!("{}{}/{}", SAFETY_PREFIX, snapshot_key, STATE_OBJECT)
}

/// Inverse of [`backup_object_key`] / [`safety_object_key`]
pub fn key_from_object<'a>(prefix: &str, object_key: &'a str) -> Option<&'a str> {
    object_key
        .strip_prefix(prefix)?
        .strip_suffix(STATE_OBJECT)?
        .strip_suffix('/')
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if s.len() != TIMESTAMP_LEN {
        return None;
    }
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
}
