//! Recovery engine
//!
//! Restores a backup record (or, for a manual rollback, a safety snapshot)
//! over an environment's live state:
//!
//! ```text
//! Listing -> Selected -> [confirmation] -> SafetyBackedUp -> Initialized -> Restored | RolledBack
//! ```
//!
//! Nothing is written before the confirmation gate passes, and the live state
//! is never written before a safety snapshot of it has been stored and
//! verified. Once the lock is held the live state is read again; if it no
//! longer matches the snapshot the restore is aborted. A failed push is reported together with the safety snapshot key;
//! the engine never rolls back on its own.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::confirm::{is_confirmed, Confirmation, ConfirmationRequest};
use crate::audit::{AuditEntry, AuditLogger, AuditStatus, Operation};
use crate::backup::keys::{
    backup_object_key, safety_object_key, safety_snapshot_key, truncate_to_second,
};
use crate::backup::{list_backups, list_safety_snapshots, BackupRecord, SafetySnapshot};
use crate::environment::Environment;
use crate::error::{StateError, StateResult};
use crate::provisioner::StateBackend;
use crate::store::{state_key, ObjectStore};

/// Steps of the recovery state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecoveryStage {
    Listing,
    Selected,
    SafetyBackedUp,
    Initialized,
    Restored,
    RolledBack,
}

/// Kind of artifact being restored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RestoreSource {
    Backup,
    SafetySnapshot,
}

/// Outcome of a successful restore
#[derive(Debug, Clone, Serialize)]
pub struct RecoveryReport {
    pub environment: Environment,
    pub namespace: String,
    pub source: RestoreSource,
    /// Backup key or safety snapshot key that was restored
    pub source_key: String,
    /// Snapshot of the state that was overwritten; `None` if there was no live state
    pub safety_snapshot: Option<SafetySnapshot>,
    /// Resources in the restored state, if the advisory post-check succeeded
    pub resource_count: Option<usize>,
    /// Non-fatal problems (failed post-check, missing prior state)
    pub warnings: Vec<String>,
    pub final_stage: RecoveryStage,
}

/// Lists and restores backups for one environment at a time
pub struct RecoveryEngine<'a> {
    app: String,
    live: &'a dyn ObjectStore,
    backups: &'a dyn ObjectStore,
    backend: &'a dyn StateBackend,
    audit: Option<&'a AuditLogger>,
}

/// Live state as captured by the safety snapshot
struct PreRestoreState {
    snapshot: Option<SafetySnapshot>,
    /// Content the snapshot holds, `None` if there was no live state
    content: Option<Vec<u8>>,
}

struct Selection {
    source: RestoreSource,
    key: String,
    object_key: String,
    taken_at: DateTime<Utc>,
}

impl<'a> RecoveryEngine<'a> {
    /// Create a new RecoveryEngine
    pub fn new(
        app: impl Into<String>,
        live: &'a dyn ObjectStore,
        backups: &'a dyn ObjectStore,
        backend: &'a dyn StateBackend,
    ) -> Self {
        Self {
            app: app.into(),
            live,
            backups,
            backend,
            audit: None,
        }
    }

    /// Record every step in the audit log
    pub fn with_audit(mut self, audit: &'a AuditLogger) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Backup records of an environment, newest first (empty if none)
    pub fn list_backups(&self, identifier: &str) -> StateResult<Vec<BackupRecord>> {
        let env = Environment::validate(identifier)?;
        list_backups(self.backups, &self.app, env)
    }

    /// Safety snapshots of an environment, newest first (empty if none)
    pub fn list_safety_snapshots(&self, identifier: &str) -> StateResult<Vec<SafetySnapshot>> {
        let env = Environment::validate(identifier)?;
        list_safety_snapshots(self.backups, &self.app, env)
    }

    /// Restore `backup_key` over the live state of `identifier`
    pub fn recover(
        &self,
        identifier: &str,
        backup_key: &str,
        confirmation: &dyn Confirmation,
    ) -> StateResult<RecoveryReport> {
        let env = Environment::validate(identifier)?;
        debug!(environment = %env, stage = ?RecoveryStage::Listing, "recovery started");

        let records = list_backups(self.backups, &self.app, env)?;
        if records.is_empty() {
            return Err(StateError::NoBackupsAvailable {
                environment: env.to_string(),
            });
        }

        let record = records
            .into_iter()
            .find(|r| r.key == backup_key)
            .ok_or_else(|| StateError::BackupNotFound {
                environment: env.to_string(),
                backup_key: backup_key.to_string(),
            })?;

        let selection = Selection {
            source: RestoreSource::Backup,
            object_key: backup_object_key(&record.key),
            key: record.key,
            taken_at: record.captured_at,
        };
        self.restore(env, selection, confirmation)
    }

    /// Push a safety snapshot back over the live state of `identifier`
    ///
    /// This is the manual undo path for a bad restore. It runs the same
    /// gated, safety-first sequence as [`recover`](Self::recover).
    pub fn rollback(
        &self,
        identifier: &str,
        snapshot_key: &str,
        confirmation: &dyn Confirmation,
    ) -> StateResult<RecoveryReport> {
        let env = Environment::validate(identifier)?;
        debug!(environment = %env, stage = ?RecoveryStage::Listing, "rollback started");

        let snapshot = list_safety_snapshots(self.backups, &self.app, env)?
            .into_iter()
            .find(|s| s.key == snapshot_key)
            .ok_or_else(|| StateError::snapshot_not_found(snapshot_key))?;

        let selection = Selection {
            source: RestoreSource::SafetySnapshot,
            object_key: safety_object_key(&snapshot.key),
            key: snapshot.key,
            taken_at: snapshot.taken_at,
        };
        self.restore(env, selection, confirmation)
    }

    fn restore(
        &self,
        env: Environment,
        selection: Selection,
        confirmation: &dyn Confirmation,
    ) -> StateResult<RecoveryReport> {
        let namespace = env.namespace(&self.app);
        let operation = match selection.source {
            RestoreSource::Backup => Operation::Restore,
            RestoreSource::SafetySnapshot => Operation::Rollback,
        };
        debug!(environment = %env, stage = ?RecoveryStage::Selected, source_key = %selection.key, "source selected");

        let request = ConfirmationRequest {
            environment: env,
            namespace: namespace.clone(),
            source_key: selection.key.clone(),
            source_taken_at: selection.taken_at,
        };
        let token = confirmation.confirm(&request);
        if !is_confirmed(token.as_deref()) {
            info!(environment = %env, source_key = %selection.key, "recovery cancelled at confirmation");
            return Err(StateError::RecoveryCancelled { namespace });
        }

        let content = self.backups.get(&selection.object_key)?;

        let mut warnings = Vec::new();
        let PreRestoreState {
            snapshot: safety_snapshot,
            content: captured,
        } = self.take_safety_snapshot(env, &namespace)?;
        if safety_snapshot.is_none() {
            warnings.push(format!(
                "{} had no live state; no safety snapshot was needed",
                namespace
            ));
        }
        let safety_key = safety_snapshot.as_ref().map(|s| s.key.clone());
        debug!(environment = %env, stage = ?RecoveryStage::SafetyBackedUp, safety_snapshot = ?safety_key, "safety snapshot stored");

        let handle = match self.backend.init(&namespace, &operation.to_string().to_lowercase()) {
            Ok(handle) => handle,
            Err(e @ StateError::StateLocked { .. }) => {
                warn!(namespace = %namespace, error = %e, "state is locked");
                self.audit_failure(operation, env, &selection.key, &e);
                return Err(e);
            }
            Err(e) => {
                let err = StateError::BackendInitFailed {
                    namespace: namespace.clone(),
                    safety_snapshot: safety_key,
                    reason: e.to_string(),
                };
                self.audit_failure(operation, env, &selection.key, &err);
                return Err(err);
            }
        };
        debug!(environment = %env, stage = ?RecoveryStage::Initialized, lock_id = %handle.lock().id, "backend initialized");

        match handle.pull() {
            Ok(current) if current == captured => {}
            Ok(_) => {
                let err = StateError::LiveStateChanged {
                    namespace: namespace.clone(),
                    safety_snapshot: safety_key,
                };
                warn!(namespace = %namespace, error = %err, "live state changed before the lock was taken");
                self.audit_failure(operation, env, &selection.key, &err);
                return Err(err);
            }
            Err(e) => {
                let err = StateError::BackendInitFailed {
                    namespace: namespace.clone(),
                    safety_snapshot: safety_key,
                    reason: e.to_string(),
                };
                self.audit_failure(operation, env, &selection.key, &err);
                return Err(err);
            }
        }

        if let Err(e) = handle.push(&content) {
            let err = StateError::RestoreFailed {
                namespace: namespace.clone(),
                backup_key: selection.key.clone(),
                safety_snapshot: safety_key,
                reason: e.to_string(),
            };
            error!(namespace = %namespace, error = %err, "restore failed");
            self.audit_failure(operation, env, &selection.key, &err);
            return Err(err);
        }

        let final_stage = match selection.source {
            RestoreSource::Backup => RecoveryStage::Restored,
            RestoreSource::SafetySnapshot => RecoveryStage::RolledBack,
        };
        info!(environment = %env, stage = ?final_stage, source_key = %selection.key, "live state replaced");

        // Advisory only: the restore already happened
        let resource_count = match handle.list_resources() {
            Ok(resources) => Some(resources.len()),
            Err(e) => {
                warn!(namespace = %namespace, error = %e, "post-restore resource listing failed");
                warnings.push(format!("post-restore resource listing failed: {}", e));
                None
            }
        };
        drop(handle);

        if let Some(audit) = self.audit {
            let mut entry = AuditEntry::succeeded(operation, env, selection.key.clone());
            if let Some(key) = &safety_key {
                entry = entry.with_detail(format!("safety snapshot {}", key));
            }
            audit.record(entry);
        }

        Ok(RecoveryReport {
            environment: env,
            namespace,
            source: selection.source,
            source_key: selection.key,
            safety_snapshot,
            resource_count,
            warnings,
            final_stage,
        })
    }

    /// Copy the current live state to a fresh safety snapshot and verify it
    fn take_safety_snapshot(&self, env: Environment, namespace: &str) -> StateResult<PreRestoreState> {
        let source = state_key(namespace);
        let taken_at = truncate_to_second(Utc::now());
        let suffix = Uuid::new_v4().simple().to_string();
        let key = safety_snapshot_key(&self.app, env, taken_at, &suffix[..8]);
        let object_key = safety_object_key(&key);

        let fail = |reason: String| {
            let err = StateError::SafetyBackupFailed {
                namespace: namespace.to_string(),
                snapshot_key: key.clone(),
                reason,
            };
            error!(namespace, error = %err, "safety snapshot failed");
            self.audit_failure(Operation::SafetySnapshot, env, &key, &err);
            err
        };

        match self.live.head(&source) {
            Ok(Some(_)) => {}
            Ok(None) => {
                warn!(namespace, "no live state to snapshot");
                if let Some(audit) = self.audit {
                    audit.record(
                        AuditEntry::new(Operation::SafetySnapshot, Some(env), namespace, AuditStatus::Skipped)
                            .with_detail("no live state"),
                    );
                }
                return Ok(PreRestoreState {
                    snapshot: None,
                    content: None,
                });
            }
            Err(e) => return Err(fail(e.to_string())),
        }

        let content = self.live.get(&source).map_err(|e| fail(e.to_string()))?;
        let meta = self
            .backups
            .put(&object_key, &content)
            .map_err(|e| fail(e.to_string()))?;

        match self.backups.head(&object_key) {
            Ok(Some(stored)) if stored.size_bytes == meta.size_bytes => {}
            Ok(_) => return Err(fail("snapshot could not be read back after writing".to_string())),
            Err(e) => return Err(fail(e.to_string())),
        }

        info!(namespace, snapshot_key = %key, size = meta.size_bytes, "safety snapshot stored");
        if let Some(audit) = self.audit {
            audit.record(AuditEntry::succeeded(Operation::SafetySnapshot, env, key.clone()));
        }

        Ok(PreRestoreState {
            snapshot: Some(SafetySnapshot {
                environment: env,
                location: self.backups.location(&object_key),
                key,
                taken_at,
                size_bytes: meta.size_bytes,
            }),
            content: Some(content),
        })
    }

    fn audit_failure(&self, operation: Operation, env: Environment, artifact: &str, err: &StateError) {
        if let Some(audit) = self.audit {
            audit.record(AuditEntry::failed(operation, env, artifact, err.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::BackupEngine;
    use crate::provisioner::LocalStateBackend;
    use crate::recovery::PresuppliedToken;
    use crate::store::{LocalObjectStore, Versioning};
    use tempfile::TempDir;

    struct Fixture {
        live: LocalObjectStore,
        backups: LocalObjectStore,
        backend: LocalStateBackend,
        audit: AuditLogger,
        _temp: TempDir,
    }

    fn fixture() -> Fixture {
        let temp = TempDir::new().unwrap();
        let live = LocalObjectStore::open(temp.path().join("live"), Versioning::Enabled);
        Fixture {
            backend: LocalStateBackend::new(live.clone(), "tester"),
            live,
            backups: LocalObjectStore::open(temp.path().join("backups"), Versioning::Disabled),
            audit: AuditLogger::new(temp.path().join("audit.log")),
            _temp: temp,
        }
    }

    impl Fixture {
        fn engine(&self) -> RecoveryEngine<'_> {
            RecoveryEngine::new("shop", &self.live, &self.backups, &self.backend).with_audit(&self.audit)
        }

        fn backup(&self, env: &str) -> String {
            let result = BackupEngine::new("shop", &self.live, &self.backups).backup(&[env]);
            result.succeeded()[0].key.clone()
        }
    }

    fn yes() -> PresuppliedToken {
        PresuppliedToken("yes".into())
    }

    const STAGING: &str = "shop/staging/default.tfstate";

    #[test]
    fn test_recover_restores_and_snapshots() {
        let f = fixture();
        f.live.put(STAGING, b"S0").unwrap();
        let key = f.backup("staging");
        f.live.put(STAGING, b"S1").unwrap();

        let report = f.engine().recover("staging", &key, &yes()).unwrap();

        assert_eq!(f.live.get(STAGING).unwrap(), b"S0");
        assert_eq!(report.final_stage, RecoveryStage::Restored);
        let snapshot = report.safety_snapshot.unwrap();
        assert_eq!(
            f.backups.get(&safety_object_key(&snapshot.key)).unwrap(),
            b"S1"
        );
        // Post-check could not parse "S0" as state: advisory only
        assert!(report.resource_count.is_none());
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn test_list_for_unknown_environment_is_rejected() {
        let f = fixture();
        let err = f.engine().list_backups("qa").unwrap_err();
        assert!(matches!(err, StateError::InvalidEnvironment(_)));
    }

    #[test]
    fn test_no_backups_available() {
        let f = fixture();
        let err = f
            .engine()
            .recover("production", "shop-production-20250101-000000", &yes())
            .unwrap_err();
        assert!(matches!(err, StateError::NoBackupsAvailable { .. }));
    }

    #[test]
    fn test_unknown_backup_key() {
        let f = fixture();
        f.live.put(STAGING, b"S0").unwrap();
        f.backup("staging");

        let err = f
            .engine()
            .recover("staging", "shop-staging-19990101-000000", &yes())
            .unwrap_err();
        assert!(matches!(err, StateError::BackupNotFound { .. }));
        assert!(f.engine().list_safety_snapshots("staging").unwrap().is_empty());
    }

    #[test]
    fn test_rejected_confirmation_writes_nothing() {
        let f = fixture();
        f.live.put(STAGING, b"S0").unwrap();
        let key = f.backup("staging");
        f.live.put(STAGING, b"S1").unwrap();
        let generations_before = f.live.versions(STAGING).unwrap().len();

        let err = f
            .engine()
            .recover("staging", &key, &PresuppliedToken("y".into()))
            .unwrap_err();

        assert!(matches!(err, StateError::RecoveryCancelled { .. }));
        assert_eq!(f.live.get(STAGING).unwrap(), b"S1");
        assert_eq!(f.live.versions(STAGING).unwrap().len(), generations_before);
        assert!(f.engine().list_safety_snapshots("staging").unwrap().is_empty());
    }

    #[test]
    fn test_state_locked_leaves_live_untouched() {
        let f = fixture();
        f.live.put(STAGING, b"S0").unwrap();
        let key = f.backup("staging");
        f.live.put(STAGING, b"S1").unwrap();
        let _held = f.backend.init("shop/staging", "apply").unwrap();

        let err = f.engine().recover("staging", &key, &yes()).unwrap_err();

        assert!(matches!(err, StateError::StateLocked { .. }));
        assert_eq!(f.live.get(STAGING).unwrap(), b"S1");
    }

    #[test]
    fn test_rollback_undoes_a_restore() {
        let f = fixture();
        f.live.put(STAGING, b"S0").unwrap();
        let key = f.backup("staging");
        f.live.put(STAGING, b"S1").unwrap();

        let report = f.engine().recover("staging", &key, &yes()).unwrap();
        let snapshot_key = report.safety_snapshot.unwrap().key;

        let rollback = f.engine().rollback("staging", &snapshot_key, &yes()).unwrap();

        assert_eq!(rollback.final_stage, RecoveryStage::RolledBack);
        assert_eq!(f.live.get(STAGING).unwrap(), b"S1");
        // The rollback itself was preceded by a snapshot of S0
        assert_eq!(f.engine().list_safety_snapshots("staging").unwrap().len(), 2);
    }

    #[test]
    fn test_restore_into_empty_environment() {
        let f = fixture();
        f.live.put(STAGING, br#"{"resources": []}"#).unwrap();
        let key = f.backup("staging");
        f.live.delete(STAGING).unwrap();

        let report = f.engine().recover("staging", &key, &yes()).unwrap();

        assert!(report.safety_snapshot.is_none());
        assert_eq!(report.resource_count, Some(0));
        assert_eq!(f.live.get(STAGING).unwrap(), br#"{"resources": []}"#);
    }

    #[test]
    fn test_audit_trail() {
        let f = fixture();
        f.live.put(STAGING, b"S0").unwrap();
        let key = f.backup("staging");

        f.engine().recover("staging", &key, &yes()).unwrap();

        let operations: Vec<Operation> = f.audit.read_all().unwrap().iter().map(|e| e.operation).collect();
        assert_eq!(operations, vec![Operation::SafetySnapshot, Operation::Restore]);
    }
}
