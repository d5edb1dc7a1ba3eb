//! Shared fixtures: local stores in a temp dir plus fault-injecting wrappers
#![allow(dead_code)]

use std::cell::Cell;

use statekeeper::lifecycle::LifecycleRule;
use statekeeper::provisioner::{LocalStateBackend, LockInfo, StateBackend, StateHandle};
use statekeeper::store::{LocalObjectStore, ObjectMeta, ObjectStore, Versioning};
use statekeeper::{StateError, StateResult};
use tempfile::TempDir;

pub const APP: &str = "shop";

pub fn state_key(env: &str) -> String {
    format!("{}/{}/default.tfstate", APP, env)
}

/// Which calls fail, by key prefix
#[derive(Debug, Default, Clone)]
pub struct Faults {
    pub head: Vec<String>,
    pub get: Vec<String>,
    pub put: Vec<String>,
    pub list: bool,
}

fn hits(prefixes: &[String], key: &str) -> bool {
    prefixes.iter().any(|p| key.starts_with(p.as_str()))
}

fn injected(key: &str) -> StateError {
    StateError::transient(key, "injected failure")
}

/// Object store wrapper that counts calls and fails on demand
pub struct FaultyStore {
    pub inner: LocalObjectStore,
    pub faults: Faults,
    pub calls: Cell<usize>,
    pub writes: Cell<usize>,
}

impl FaultyStore {
    pub fn new(inner: LocalObjectStore) -> Self {
        Self::with_faults(inner, Faults::default())
    }

    pub fn with_faults(inner: LocalObjectStore, faults: Faults) -> Self {
        Self {
            inner,
            faults,
            calls: Cell::new(0),
            writes: Cell::new(0),
        }
    }

    fn call(&self) {
        self.calls.set(self.calls.get() + 1);
    }

    fn write(&self) {
        self.call();
        self.writes.set(self.writes.get() + 1);
    }
}

impl ObjectStore for FaultyStore {
    fn location(&self, key: &str) -> String {
        self.inner.location(key)
    }

    fn head(&self, key: &str) -> StateResult<Option<ObjectMeta>> {
        self.call();
        if hits(&self.faults.head, key) {
            return Err(injected(key));
        }
        self.inner.head(key)
    }

    fn get(&self, key: &str) -> StateResult<Vec<u8>> {
        self.call();
        if hits(&self.faults.get, key) {
            return Err(injected(key));
        }
        self.inner.get(key)
    }

    fn put(&self, key: &str, data: &[u8]) -> StateResult<ObjectMeta> {
        self.write();
        if hits(&self.faults.put, key) {
            return Err(injected(key));
        }
        self.inner.put(key, data)
    }

    fn delete(&self, key: &str) -> StateResult<()> {
        self.write();
        self.inner.delete(key)
    }

    fn list(&self, prefix: &str) -> StateResult<Vec<ObjectMeta>> {
        self.call();
        if self.faults.list {
            return Err(injected(prefix));
        }
        self.inner.list(prefix)
    }

    fn lifecycle(&self) -> StateResult<Vec<LifecycleRule>> {
        self.call();
        self.inner.lifecycle()
    }

    fn set_lifecycle(&self, rules: &[LifecycleRule]) -> StateResult<()> {
        self.write();
        self.inner.set_lifecycle(rules)
    }
}

/// Backend wrapper that can fail init, push or the resource listing
#[derive(Default)]
pub struct BackendFaults {
    pub init: bool,
    pub push: bool,
    pub list_resources: bool,
}

pub struct FaultyBackend {
    pub inner: LocalStateBackend,
    pub faults: BackendFaults,
    pub inits: Cell<usize>,
}

impl FaultyBackend {
    pub fn new(inner: LocalStateBackend, faults: BackendFaults) -> Self {
        Self {
            inner,
            faults,
            inits: Cell::new(0),
        }
    }
}

impl StateBackend for FaultyBackend {
    fn init(&self, namespace: &str, operation: &str) -> StateResult<Box<dyn StateHandle + '_>> {
        self.inits.set(self.inits.get() + 1);
        if self.faults.init {
            return Err(StateError::transient(namespace, "backend unreachable"));
        }
        let inner = self.inner.init(namespace, operation)?;
        Ok(Box::new(FaultyHandle {
            inner,
            fail_push: self.faults.push,
            fail_list: self.faults.list_resources,
        }))
    }

    fn lock_info(&self, namespace: &str) -> StateResult<Option<LockInfo>> {
        self.inner.lock_info(namespace)
    }

    fn force_unlock(&self, namespace: &str, lock_id: &str) -> StateResult<LockInfo> {
        self.inner.force_unlock(namespace, lock_id)
    }
}

struct FaultyHandle<'a> {
    inner: Box<dyn StateHandle + 'a>,
    fail_push: bool,
    fail_list: bool,
}

impl StateHandle for FaultyHandle<'_> {
    fn namespace(&self) -> &str {
        self.inner.namespace()
    }

    fn lock(&self) -> &LockInfo {
        self.inner.lock()
    }

    fn pull(&self) -> StateResult<Option<Vec<u8>>> {
        self.inner.pull()
    }

    fn push(&self, content: &[u8]) -> StateResult<ObjectMeta> {
        if self.fail_push {
            return Err(StateError::transient(self.inner.namespace(), "quota exceeded"));
        }
        self.inner.push(content)
    }

    fn list_resources(&self) -> StateResult<Vec<String>> {
        if self.fail_list {
            return Err(StateError::transient(self.inner.namespace(), "provider timeout"));
        }
        self.inner.list_resources()
    }
}

/// Versioned live store and unversioned backup store in one temp dir
pub struct Stores {
    pub live: LocalObjectStore,
    pub backups: LocalObjectStore,
    _temp: TempDir,
}

impl Stores {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        Self {
            live: LocalObjectStore::open(temp.path().join("live"), Versioning::Enabled),
            backups: LocalObjectStore::open(temp.path().join("backups"), Versioning::Disabled),
            _temp: temp,
        }
    }

    pub fn backend(&self) -> LocalStateBackend {
        LocalStateBackend::new(self.live.clone(), "tester")
    }
}
