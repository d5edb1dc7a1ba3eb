//! Object storage collaborator
//!
//! The state subsystem only issues read/write/list operations against object
//! storage; versioning and lifecycle evaluation belong to the store itself.
//! [`ObjectStore`] is that seam, and [`LocalObjectStore`] is a filesystem
//! implementation with per-object versioning and lifecycle sweeps.

pub mod file_io;
mod local;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{StateError, StateResult};
use crate::lifecycle::LifecycleRule;

pub use local::{LocalObjectStore, SweepReport, Versioning};

/// Object name of the provisioning state inside a namespace
pub const STATE_OBJECT: &str = "default.tfstate";

/// Key of the live State Blob for a namespace: `<app>/<environment>/default.tfstate`
pub fn state_key(namespace: &str) -> String {
    format!("{}/{}", namespace, STATE_OBJECT)
}

/// Metadata for one object version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    /// Object key
    pub key: String,
    /// Version marker assigned by the store on write
    pub generation: u64,
    /// Size in bytes
    pub size_bytes: u64,
    /// When this version was written
    pub created_at: DateTime<Utc>,
}

/// Minimal object storage interface
pub trait ObjectStore {
    /// Display location of a key, for messages and records
    fn location(&self, key: &str) -> String;

    /// Metadata of the live version, `None` if the object does not exist
    fn head(&self, key: &str) -> StateResult<Option<ObjectMeta>>;

    /// Content of the live version; `NotFound` if absent
    fn get(&self, key: &str) -> StateResult<Vec<u8>>;

    /// Write a new live version, returning its metadata
    fn put(&self, key: &str, data: &[u8]) -> StateResult<ObjectMeta>;

    /// Delete the live version
    fn delete(&self, key: &str) -> StateResult<()>;

    /// Live objects whose key starts with `prefix`, in key order
    fn list(&self, prefix: &str) -> StateResult<Vec<ObjectMeta>>;

    /// Currently declared lifecycle rules
    fn lifecycle(&self) -> StateResult<Vec<LifecycleRule>>;

    /// Replace the declared lifecycle rules
    fn set_lifecycle(&self, rules: &[LifecycleRule]) -> StateResult<()>;

    /// Whether the live version exists
    fn exists(&self, key: &str) -> StateResult<bool> {
        Ok(self.head(key)?.is_some())
    }
}

/// Copy the live version of `src_key` into another store
pub fn copy_object(
    src: &dyn ObjectStore,
    src_key: &str,
    dst: &dyn ObjectStore,
    dst_key: &str,
) -> StateResult<ObjectMeta> {
    let data = src.get(src_key)?;
    let meta = dst.put(dst_key, &data)?;
    if meta.size_bytes != data.len() as u64 {
        return Err(StateError::transient(
            dst.location(dst_key),
            format!(
                "copy wrote {} bytes, expected {}",
                meta.size_bytes,
                data.len()
            ),
        ));
    }
    Ok(meta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_state_key() {
        assert_eq!(state_key("shop/staging"), "shop/staging/default.tfstate");
    }

    #[test]
    fn test_copy_between_stores() {
        let temp = TempDir::new().unwrap();
        let live = LocalObjectStore::open(temp.path().join("live"), Versioning::Enabled);
        let backups = LocalObjectStore::open(temp.path().join("backups"), Versioning::Disabled);

        live.put("shop/staging/default.tfstate", b"S0").unwrap();
        let meta = copy_object(
            &live,
            "shop/staging/default.tfstate",
            &backups,
            "backups/shop-staging-20250101-000000/default.tfstate",
        )
        .unwrap();

        assert_eq!(meta.size_bytes, 2);
        assert_eq!(
            backups
                .get("backups/shop-staging-20250101-000000/default.tfstate")
                .unwrap(),
            b"S0"
        );
    }

    #[test]
    fn test_copy_missing_source_is_not_found() {
        let temp = TempDir::new().unwrap();
        let live = LocalObjectStore::open(temp.path().join("live"), Versioning::Enabled);
        let backups = LocalObjectStore::open(temp.path().join("backups"), Versioning::Disabled);

        let err = copy_object(&live, "shop/prod/default.tfstate", &backups, "x").unwrap_err();
        assert!(err.is_not_found());
        assert!(backups.list("").unwrap().is_empty());
    }
}
