//! Backup engine
//!
//! Copies the live state of each requested environment into a timestamped,
//! immutable backup record. Environments are processed in isolation: one
//! environment failing is reported and the engine moves on to the next.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::catalog::BackupRecord;
use super::keys::{backup_key, backup_object_key, truncate_to_second};
use crate::audit::{AuditEntry, AuditLogger, AuditStatus, Operation};
use crate::environment::Environment;
use crate::error::{CommandOutcome, StateError, StateResult};
use crate::store::{copy_object, state_key, ObjectStore};

/// What happened to one environment
#[derive(Debug)]
pub enum BackupStatus {
    /// Live state copied into a new backup record
    BackedUp(BackupRecord),
    /// The environment has no live state (never provisioned)
    NotFound,
    /// The copy failed; remaining environments were still processed
    Failed(StateError),
}

/// Per-environment entry of a batch backup
#[derive(Debug)]
pub struct EnvironmentBackup {
    /// Identifier as requested
    pub identifier: String,
    pub status: BackupStatus,
}

/// Aggregate result of a batch backup
#[derive(Debug, Default)]
pub struct BackupResult {
    pub entries: Vec<EnvironmentBackup>,
}

impl BackupResult {
    /// Records created by this run
    pub fn succeeded(&self) -> Vec<&BackupRecord> {
        self.entries
            .iter()
            .filter_map(|e| match &e.status {
                BackupStatus::BackedUp(record) => Some(record),
                _ => None,
            })
            .collect()
    }

    /// Identifiers that had no live state
    pub fn not_found(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| matches!(e.status, BackupStatus::NotFound))
            .map(|e| e.identifier.as_str())
            .collect()
    }

    /// Identifiers that failed, with the reason
    pub fn failed(&self) -> Vec<(&str, &StateError)> {
        self.entries
            .iter()
            .filter_map(|e| match &e.status {
                BackupStatus::Failed(err) => Some((e.identifier.as_str(), err)),
                _ => None,
            })
            .collect()
    }

    pub fn success_count(&self) -> usize {
        self.succeeded().len()
    }

    pub fn failure_count(&self) -> usize {
        self.failed().len()
    }

    /// Success if nothing failed, hard failure if everything failed,
    /// partial failure otherwise
    pub fn outcome(&self) -> CommandOutcome {
        let failures = self.failure_count();
        if failures == 0 {
            CommandOutcome::Success
        } else if failures == self.entries.len() {
            CommandOutcome::HardFailure
        } else {
            CommandOutcome::PartialFailure
        }
    }
}

/// Captures live state into the backup store
pub struct BackupEngine<'a> {
    app: String,
    live: &'a dyn ObjectStore,
    backups: &'a dyn ObjectStore,
    audit: Option<&'a AuditLogger>,
}

impl<'a> BackupEngine<'a> {
    /// Create a new BackupEngine
    pub fn new(app: impl Into<String>, live: &'a dyn ObjectStore, backups: &'a dyn ObjectStore) -> Self {
        Self {
            app: app.into(),
            live,
            backups,
            audit: None,
        }
    }

    /// Record every backup in the audit log
    pub fn with_audit(mut self, audit: &'a AuditLogger) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Back up the given environments (all of them if `identifiers` is empty)
    pub fn backup(&self, identifiers: &[&str]) -> BackupResult {
        self.backup_at(identifiers, Utc::now())
    }

    /// Back up with an explicit capture time
    pub fn backup_at(&self, identifiers: &[&str], now: DateTime<Utc>) -> BackupResult {
        let requested: Vec<&str> = if identifiers.is_empty() {
            Environment::all().iter().map(|e| e.identifier()).collect()
        } else {
            identifiers.to_vec()
        };

        let mut result = BackupResult::default();
        for identifier in requested {
            if result.entries.iter().any(|e| e.identifier == identifier) {
                continue;
            }

            let status = match Environment::validate(identifier) {
                Ok(env) => match self.backup_environment(env, now) {
                    Ok(Some(record)) => BackupStatus::BackedUp(record),
                    Ok(None) => BackupStatus::NotFound,
                    Err(e) => BackupStatus::Failed(e),
                },
                Err(e) => BackupStatus::Failed(e),
            };

            result.entries.push(EnvironmentBackup {
                identifier: identifier.to_string(),
                status,
            });
        }

        info!(
            succeeded = result.success_count(),
            not_found = result.not_found().len(),
            failed = result.failure_count(),
            "backup run finished"
        );
        result
    }

    /// Back up one environment; `Ok(None)` means it has no live state
    ///
    /// A record with the same key (same second) is overwritten.
    pub fn backup_environment(
        &self,
        env: Environment,
        now: DateTime<Utc>,
    ) -> StateResult<Option<BackupRecord>> {
        let namespace = env.namespace(&self.app);
        let source = state_key(&namespace);

        let exists = self.live.exists(&source).map_err(|e| {
            warn!(environment = %env, error = %e, "could not check live state");
            self.audit_failure(env, &namespace, &e);
            e
        })?;
        if !exists {
            info!(environment = %env, namespace = %namespace, "no live state, nothing to back up");
            if let Some(audit) = self.audit {
                audit.record(
                    AuditEntry::new(Operation::Backup, Some(env), namespace, AuditStatus::Skipped)
                        .with_detail("no live state"),
                );
            }
            return Ok(None);
        }

        let captured_at = truncate_to_second(now);
        let key = backup_key(&self.app, env, captured_at);
        let destination = backup_object_key(&key);

        let meta = copy_object(self.live, &source, self.backups, &destination).map_err(|e| {
            warn!(environment = %env, backup_key = %key, error = %e, "backup failed");
            self.audit_failure(env, &key, &e);
            e
        })?;

        let record = BackupRecord {
            environment: env,
            key,
            captured_at,
            size_bytes: meta.size_bytes,
            location: self.backups.location(&destination),
        };

        info!(environment = %env, backup_key = %record.key, size = record.size_bytes, "backup created");
        if let Some(audit) = self.audit {
            audit.record(
                AuditEntry::succeeded(Operation::Backup, env, record.key.clone())
                    .with_detail(format!("{} bytes from {}", record.size_bytes, namespace)),
            );
        }
        Ok(Some(record))
    }

    fn audit_failure(&self, env: Environment, artifact: &str, err: &StateError) {
        if let Some(audit) = self.audit {
            audit.record(AuditEntry::failed(Operation::Backup, env, artifact, err.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{LocalObjectStore, Versioning};
    use chrono::TimeZone;
    use tempfile::TempDir;

    struct Fixture {
        live: LocalObjectStore,
        backups: LocalObjectStore,
        audit: AuditLogger,
        _temp: TempDir,
    }

    fn fixture() -> Fixture {
        let temp = TempDir::new().unwrap();
        Fixture {
            live: LocalObjectStore::open(temp.path().join("live"), Versioning::Enabled),
            backups: LocalObjectStore::open(temp.path().join("backups"), Versioning::Disabled),
            audit: AuditLogger::new(temp.path().join("audit.log")),
            _temp: temp,
        }
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap()
    }

    #[test]
    fn test_backup_single_environment() {
        let f = fixture();
        f.live.put("shop/staging/default.tfstate", b"S0").unwrap();
        let engine = BackupEngine::new("shop", &f.live, &f.backups).with_audit(&f.audit);

        let result = engine.backup_at(&["staging"], at());

        assert_eq!(result.outcome(), CommandOutcome::Success);
        let records = result.succeeded();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].key, "shop-staging-20250314-092653");
        assert_eq!(records[0].captured_at, at());
        assert_eq!(
            f.backups
                .get("backups/shop-staging-20250314-092653/default.tfstate")
                .unwrap(),
            b"S0"
        );
        assert_eq!(f.audit.entry_count().unwrap(), 1);
    }

    #[test]
    fn test_missing_live_state_is_not_found_not_failed() {
        let f = fixture();
        f.live.put("shop/staging/default.tfstate", b"S0").unwrap();
        let engine = BackupEngine::new("shop", &f.live, &f.backups);

        let result = engine.backup_at(&[], at());

        assert_eq!(result.entries.len(), 3);
        assert_eq!(result.success_count(), 1);
        assert_eq!(result.not_found(), vec!["development", "production"]);
        assert_eq!(result.failure_count(), 0);
        assert_eq!(result.outcome(), CommandOutcome::Success);
    }

    #[test]
    fn test_invalid_identifier_fails_without_io() {
        let f = fixture();
        let engine = BackupEngine::new("shop", &f.live, &f.backups);

        let result = engine.backup_at(&["prod"], at());

        let failed = result.failed();
        assert_eq!(failed.len(), 1);
        assert!(matches!(failed[0].1, StateError::InvalidEnvironment(_)));
        assert_eq!(result.outcome(), CommandOutcome::HardFailure);
        assert!(f.backups.list("").unwrap().is_empty());
    }

    #[test]
    fn test_same_second_backup_overwrites() {
        let f = fixture();
        let engine = BackupEngine::new("shop", &f.live, &f.backups);

        f.live.put("shop/production/default.tfstate", b"first").unwrap();
        let first = engine.backup_at(&["production"], at());
        f.live.put("shop/production/default.tfstate", b"second").unwrap();
        let second = engine.backup_at(&["production"], at() + chrono::Duration::milliseconds(400));

        assert_eq!(first.outcome(), CommandOutcome::Success);
        assert_eq!(second.outcome(), CommandOutcome::Success);
        let listed = f.backups.list("backups/").unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(
            f.backups.get(&listed[0].key).unwrap(),
            b"second"
        );
    }

    #[test]
    fn test_duplicate_identifiers_are_backed_up_once() {
        let f = fixture();
        f.live.put("shop/staging/default.tfstate", b"S0").unwrap();
        let engine = BackupEngine::new("shop", &f.live, &f.backups);

        let result = engine.backup_at(&["staging", "staging"], at());
        assert_eq!(result.entries.len(), 1);
    }
}
