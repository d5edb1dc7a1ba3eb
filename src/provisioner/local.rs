//! Lock-file based provisioning backend over a local object store

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{resource_addresses, LockInfo, StateBackend, StateHandle, UNREADABLE_LOCK_ID};
use crate::error::{StateError, StateResult};
use crate::store::{state_key, LocalObjectStore, ObjectMeta, ObjectStore};

/// Backend keeping state in a [`LocalObjectStore`] and locks under `<root>/locks`
#[derive(Debug, Clone)]
pub struct LocalStateBackend {
    store: LocalObjectStore,
    lock_dir: PathBuf,
    operator: String,
}

impl LocalStateBackend {
    pub fn new(store: LocalObjectStore, operator: impl Into<String>) -> Self {
        let lock_dir = store.root().join("locks");
        Self {
            store,
            lock_dir,
            operator: operator.into(),
        }
    }

    /// The live-state store this backend reads and writes
    pub fn store(&self) -> &LocalObjectStore {
        &self.store
    }

    fn lock_path(&self, namespace: &str) -> PathBuf {
        self.lock_dir.join(format!("{}.lock", namespace))
    }

    /// Lock currently on `namespace`
    ///
    /// A lock file that exists but does not parse (its writer died between
    /// creating and filling it) still holds the lock, under
    /// [`UNREADABLE_LOCK_ID`].
    fn read_lock(&self, namespace: &str) -> StateResult<Option<LockInfo>> {
        let path = self.lock_path(namespace);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StateError::transient(path.display().to_string(), e)),
        };
        match serde_json::from_slice(&bytes) {
            Ok(lock) => Ok(Some(lock)),
            Err(e) => {
                warn!(namespace, path = %path.display(), error = %e, "lock file is unreadable");
                let created_at = fs::metadata(&path)
                    .and_then(|m| m.modified())
                    .map(DateTime::<Utc>::from)
                    .unwrap_or_else(|_| Utc::now());
                Ok(Some(LockInfo {
                    id: UNREADABLE_LOCK_ID.to_string(),
                    namespace: namespace.to_string(),
                    operation: "unknown".to_string(),
                    holder: "unknown".to_string(),
                    created_at,
                }))
            }
        }
    }
}

impl StateBackend for LocalStateBackend {
    fn init(&self, namespace: &str, operation: &str) -> StateResult<Box<dyn StateHandle + '_>> {
        let path = self.lock_path(namespace);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| StateError::transient(parent.display().to_string(), e))?;
        }

        let lock = LockInfo {
            id: Uuid::new_v4().to_string(),
            namespace: namespace.to_string(),
            operation: operation.to_string(),
            holder: self.operator.clone(),
            created_at: Utc::now(),
        };

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                let held = self.read_lock(namespace)?;
                return Err(StateError::StateLocked {
                    namespace: namespace.to_string(),
                    lock_id: held.as_ref().map(|l| l.id.clone()).unwrap_or_default(),
                    holder: held
                        .map(|l| format!("{} ({} since {})", l.holder, l.operation, l.created_at))
                        .unwrap_or_else(|| "unknown".to_string()),
                });
            }
            Err(e) => return Err(StateError::transient(path.display().to_string(), e)),
        };

        let written = serde_json::to_vec_pretty(&lock)
            .map_err(StateError::from)
            .and_then(|json| {
                file.write_all(&json)
                    .and_then(|_| file.sync_all())
                    .map_err(|e| StateError::transient(path.display().to_string(), e))
            });
        if let Err(e) = written {
            let _ = fs::remove_file(&path);
            return Err(e);
        }

        debug!(namespace, lock_id = %lock.id, "state lock acquired");
        Ok(Box::new(LocalStateHandle {
            backend: self,
            key: state_key(namespace),
            lock,
        }))
    }

    fn lock_info(&self, namespace: &str) -> StateResult<Option<LockInfo>> {
        self.read_lock(namespace)
    }

    fn force_unlock(&self, namespace: &str, lock_id: &str) -> StateResult<LockInfo> {
        match self.read_lock(namespace)? {
            Some(lock) if lock.id == lock_id => {
                let path = self.lock_path(namespace);
                fs::remove_file(&path)
                    .map_err(|e| StateError::transient(path.display().to_string(), e))?;
                warn!(namespace, lock_id, holder = %lock.holder, "state lock force-released");
                Ok(lock)
            }
            _ => Err(StateError::LockNotHeld {
                namespace: namespace.to_string(),
                lock_id: lock_id.to_string(),
            }),
        }
    }
}

struct LocalStateHandle<'a> {
    backend: &'a LocalStateBackend,
    key: String,
    lock: LockInfo,
}

impl StateHandle for LocalStateHandle<'_> {
    fn namespace(&self) -> &str {
        &self.lock.namespace
    }

    fn lock(&self) -> &LockInfo {
        &self.lock
    }

    fn pull(&self) -> StateResult<Option<Vec<u8>>> {
        match self.backend.store.get(&self.key) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn push(&self, content: &[u8]) -> StateResult<ObjectMeta> {
        self.backend.store.put(&self.key, content)
    }

    fn list_resources(&self) -> StateResult<Vec<String>> {
        match self.pull()? {
            Some(content) => resource_addresses(&content),
            None => Ok(Vec::new()),
        }
    }
}

impl Drop for LocalStateHandle<'_> {
    fn drop(&mut self) {
        // Only release the lock if it is still ours; it may have been
        // force-released and re-acquired by someone else.
        match self.backend.read_lock(&self.lock.namespace) {
            Ok(Some(current)) if current.id == self.lock.id => {
                if let Err(e) = fs::remove_file(self.backend.lock_path(&self.lock.namespace)) {
                    warn!(namespace = %self.lock.namespace, error = %e, "failed to release state lock");
                } else {
                    debug!(namespace = %self.lock.namespace, lock_id = %self.lock.id, "state lock released");
                }
            }
            Ok(_) => {}
            Err(e) => {
                warn!(namespace = %self.lock.namespace, error = %e, "failed to read state lock on release")
            }
        }
    }
}
