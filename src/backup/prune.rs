//! Operator-requested deletion of a single backup record or safety snapshot
//!
//! Expiry is normally left to the store's lifecycle rules. This is the
//! explicit escape hatch, and it only ever removes the one artifact named.

use serde::Serialize;
use tracing::info;

use super::keys::{backup_object_key, parse_backup_key, parse_safety_snapshot_key, safety_object_key};
use crate::environment::Environment;
use crate::error::{StateError, StateResult};
use crate::store::ObjectStore;

/// What kind of artifact a key names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKind {
    Backup,
    SafetySnapshot,
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArtifactKind::Backup => write!(f, "backup"),
            ArtifactKind::SafetySnapshot => write!(f, "safety snapshot"),
        }
    }
}

/// A deleted artifact
#[derive(Debug, Clone, Serialize)]
pub struct PrunedArtifact {
    pub kind: ArtifactKind,
    pub key: String,
    pub location: String,
}

/// Resolve `key` to its object in the backup store, without touching the store
pub fn resolve_artifact(app: &str, env: Environment, key: &str) -> StateResult<(ArtifactKind, String)> {
    if parse_backup_key(app, env, key).is_some() {
        Ok((ArtifactKind::Backup, backup_object_key(key)))
    } else if parse_safety_snapshot_key(app, env, key).is_some() {
        Ok((ArtifactKind::SafetySnapshot, safety_object_key(key)))
    } else {
        Err(StateError::BackupNotFound {
            environment: env.to_string(),
            backup_key: key.to_string(),
        })
    }
}

/// Delete one backup record or safety snapshot of `env`
pub fn prune_artifact(
    store: &dyn ObjectStore,
    app: &str,
    env: Environment,
    key: &str,
) -> StateResult<PrunedArtifact> {
    let (kind, object_key) = resolve_artifact(app, env, key)?;

    if !store.exists(&object_key)? {
        return Err(match kind {
            ArtifactKind::Backup => StateError::BackupNotFound {
                environment: env.to_string(),
                backup_key: key.to_string(),
            },
            ArtifactKind::SafetySnapshot => StateError::snapshot_not_found(key),
        });
    }

    let location = store.location(&object_key);
    store.delete(&object_key)?;
    info!(environment = %env, kind = %kind, key, "artifact pruned");

    Ok(PrunedArtifact {
        kind,
        key: key.to_string(),
        location,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{LocalObjectStore, Versioning};
    use tempfile::TempDir;

    fn store() -> (TempDir, LocalObjectStore) {
        let temp = TempDir::new().unwrap();
        let store = LocalObjectStore::open(temp.path().join("backups"), Versioning::Disabled);
        (temp, store)
    }

    #[test]
    fn test_prune_backup() {
        let (_temp, store) = store();
        store
            .put("backups/shop-staging-20250101-120000/default.tfstate", b"S0")
            .unwrap();
        store
            .put("backups/shop-staging-20250102-120000/default.tfstate", b"S1")
            .unwrap();

        let pruned = prune_artifact(&store, "shop", Environment::Staging, "shop-staging-20250101-120000").unwrap();

        assert_eq!(pruned.kind, ArtifactKind::Backup);
        let remaining = store.list("backups/").unwrap();
        assert_eq!(remaining.len(), 1);
        assert!(remaining[0].key.contains("20250102"));
    }

    #[test]
    fn test_prune_safety_snapshot() {
        let key = "shop-production-pre-restore-20250101-120000-0a1b2c3d";
        let (_temp, store) = store();
        store.put(&safety_object_key(key), b"S1").unwrap();

        let pruned = prune_artifact(&store, "shop", Environment::Production, key).unwrap();

        assert_eq!(pruned.kind, ArtifactKind::SafetySnapshot);
        assert!(store.list("safety/").unwrap().is_empty());
    }

    #[test]
    fn test_key_of_other_environment_is_rejected() {
        let (_temp, store) = store();
        store
            .put("backups/shop-staging-20250101-120000/default.tfstate", b"S0")
            .unwrap();

        let err = prune_artifact(&store, "shop", Environment::Production, "shop-staging-20250101-120000")
            .unwrap_err();

        assert!(matches!(err, StateError::BackupNotFound { .. }));
        assert_eq!(store.list("backups/").unwrap().len(), 1);
    }

    #[test]
    fn test_missing_backup() {
        let (_temp, store) = store();
        let err = prune_artifact(&store, "shop", Environment::Staging, "shop-staging-20250101-120000")
            .unwrap_err();
        assert!(matches!(err, StateError::BackupNotFound { .. }));
    }
}
