//! Filesystem-backed object store
//!
//! Layout under the store root:
//!
//! ```text
//! objects/<key>/<generation>      content of every version, live or non-current
//! index/<key>.json                generations of the object (live + non-current)
//! lifecycle.json                  declared lifecycle rules
//! ```
//!
//! Content for a new generation is written in full before the index names it,
//! and the atomic index rename is the only commit point of a put or delete.
//! A failed write leaves the previous live version in place and readable.
//! Files of generations the index no longer names are removed after the
//! commit.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::file_io::{read_json, write_bytes_atomic, write_json_atomic};
use super::{ObjectMeta, ObjectStore};
use crate::error::{StateError, StateResult};
use crate::lifecycle::{LifecycleRule, VersionFacts};

/// Whether overwritten and deleted objects are kept as non-current versions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Versioning {
    Enabled,
    Disabled,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ObjectIndex {
    #[serde(default)]
    next_generation: u64,
    #[serde(default)]
    live: Option<ObjectMeta>,
    /// Newest first
    #[serde(default)]
    noncurrent: Vec<ObjectMeta>,
}

/// Versions removed by a lifecycle sweep
#[derive(Debug, Default)]
pub struct SweepReport {
    /// (key, generation, was_live)
    pub deleted: Vec<(String, u64, bool)>,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.deleted.is_empty()
    }
}

/// Object store rooted at a local directory
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
    versioning: Versioning,
}

impl LocalObjectStore {
    /// Open a store at `root`; directories are created lazily on first write
    pub fn open(root: impl Into<PathBuf>, versioning: Versioning) -> Self {
        Self {
            root: root.into(),
            versioning,
        }
    }

    /// Store root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn versioning(&self) -> Versioning {
        self.versioning
    }

    /// All versions of an object, live first, then non-current newest first
    pub fn versions(&self, key: &str) -> StateResult<Vec<ObjectMeta>> {
        let index = self.load_index(key)?;
        Ok(index.live.into_iter().chain(index.noncurrent).collect())
    }

    /// Content of a specific generation, live or non-current
    pub fn get_version(&self, key: &str, generation: u64) -> StateResult<Vec<u8>> {
        let index = self.load_index(key)?;
        let known = index
            .live
            .iter()
            .chain(index.noncurrent.iter())
            .any(|m| m.generation == generation);
        if !known {
            return Err(StateError::object_not_found(format!("{}#{}", key, generation)));
        }
        self.read_generation(key, generation)
    }

    /// Apply the declared lifecycle rules as of `now`
    ///
    /// This stands in for the provider's own scheduled evaluation.
    pub fn sweep_lifecycle(&self, now: DateTime<Utc>) -> StateResult<SweepReport> {
        let rules = self.lifecycle()?;
        let mut report = SweepReport::default();
        if rules.is_empty() {
            return Ok(report);
        }

        for key in self.all_keys()? {
            let mut index = self.load_index(&key)?;
            let mut obsolete = Vec::new();
            let deleted_before = report.deleted.len();

            // Non-current versions: the live version (if any) counts as newer
            let live_offset = u32::from(index.live.is_some());
            let mut kept = Vec::with_capacity(index.noncurrent.len());
            for (i, meta) in index.noncurrent.iter().enumerate() {
                let facts = VersionFacts {
                    key: &key,
                    is_live: false,
                    newer_versions: live_offset + i as u32,
                    age_days: (now - meta.created_at).num_days(),
                };
                if rules.iter().any(|rule| rule.condition.matches(&facts)) {
                    obsolete.push(meta.generation);
                    report.deleted.push((key.clone(), meta.generation, false));
                } else {
                    kept.push(meta.clone());
                }
            }
            index.noncurrent = kept;

            if let Some(live) = index.live.clone() {
                let facts = VersionFacts {
                    key: &key,
                    is_live: true,
                    newer_versions: 0,
                    age_days: (now - live.created_at).num_days(),
                };
                if rules.iter().any(|rule| rule.condition.matches(&facts)) {
                    obsolete.extend(self.retire_live(&mut index));
                    report.deleted.push((key.clone(), live.generation, true));
                }
            }

            if report.deleted.len() != deleted_before {
                self.save_index(&key, &index)?;
                for generation in obsolete {
                    self.discard(&key, generation);
                }
            }
        }

        debug!(root = %self.root.display(), deleted = report.deleted.len(), "lifecycle sweep finished");
        Ok(report)
    }

    fn object_dir(&self, key: &str) -> PathBuf {
        self.root.join("objects").join(key)
    }

    fn index_path(&self, key: &str) -> PathBuf {
        self.root.join("index").join(format!("{}.json", key))
    }

    fn version_path(&self, key: &str, generation: u64) -> PathBuf {
        self.object_dir(key).join(generation.to_string())
    }

    fn lifecycle_path(&self) -> PathBuf {
        self.root.join("lifecycle.json")
    }

    fn load_index(&self, key: &str) -> StateResult<ObjectIndex> {
        read_json(self.index_path(key))
    }

    fn save_index(&self, key: &str, index: &ObjectIndex) -> StateResult<()> {
        write_json_atomic(self.index_path(key), index)
    }

    fn read_generation(&self, key: &str, generation: u64) -> StateResult<Vec<u8>> {
        let path = self.version_path(key, generation);
        fs::read(&path).map_err(|e| StateError::transient(path.display().to_string(), e))
    }

    /// Take the live version out of the index
    ///
    /// Versioned stores keep it as the newest non-current version. Otherwise
    /// its generation is returned so the caller can discard the content once
    /// the index is saved.
    fn retire_live(&self, index: &mut ObjectIndex) -> Option<u64> {
        let live = index.live.take()?;
        match self.versioning {
            Versioning::Enabled => {
                index.noncurrent.insert(0, live);
                None
            }
            Versioning::Disabled => Some(live.generation),
        }
    }

    /// Remove the content of a generation the index no longer names
    fn discard(&self, key: &str, generation: u64) {
        let path = self.version_path(key, generation);
        if let Err(e) = remove_if_exists(&path) {
            warn!(key, generation, error = %e, "failed to remove unreferenced object content");
        }
    }

    fn all_keys(&self) -> StateResult<Vec<String>> {
        let index_root = self.root.join("index");
        let mut keys = Vec::new();
        collect_index_keys(&index_root, &index_root, &mut keys)?;
        keys.sort();
        Ok(keys)
    }
}

impl ObjectStore for LocalObjectStore {
    fn location(&self, key: &str) -> String {
        format!("file://{}", self.object_dir(key).display())
    }

    fn head(&self, key: &str) -> StateResult<Option<ObjectMeta>> {
        Ok(self.load_index(key)?.live)
    }

    fn get(&self, key: &str) -> StateResult<Vec<u8>> {
        match self.head(key)? {
            Some(live) => self.read_generation(key, live.generation),
            None => Err(StateError::object_not_found(key)),
        }
    }

    fn put(&self, key: &str, data: &[u8]) -> StateResult<ObjectMeta> {
        validate_key(key)?;
        let mut index = self.load_index(key)?;

        let meta = ObjectMeta {
            key: key.to_string(),
            generation: index.next_generation + 1,
            size_bytes: data.len() as u64,
            created_at: Utc::now(),
        };
        // Not visible until the index names it
        write_bytes_atomic(self.version_path(key, meta.generation), data)?;

        let obsolete = self.retire_live(&mut index);
        index.next_generation = meta.generation;
        index.live = Some(meta.clone());
        if let Err(e) = self.save_index(key, &index) {
            self.discard(key, meta.generation);
            return Err(e);
        }
        if let Some(generation) = obsolete {
            self.discard(key, generation);
        }

        debug!(key, generation = meta.generation, size = meta.size_bytes, "object written");
        Ok(meta)
    }

    fn delete(&self, key: &str) -> StateResult<()> {
        let mut index = self.load_index(key)?;
        if index.live.is_none() {
            return Err(StateError::object_not_found(key));
        }
        let obsolete = self.retire_live(&mut index);
        self.save_index(key, &index)?;
        if let Some(generation) = obsolete {
            self.discard(key, generation);
        }
        Ok(())
    }

    fn list(&self, prefix: &str) -> StateResult<Vec<ObjectMeta>> {
        let mut objects = Vec::new();
        for key in self.all_keys()? {
            if !key.starts_with(prefix) {
                continue;
            }
            if let Some(meta) = self.load_index(&key)?.live {
                objects.push(meta);
            }
        }
        Ok(objects)
    }

    fn lifecycle(&self) -> StateResult<Vec<LifecycleRule>> {
        read_json(self.lifecycle_path())
    }

    fn set_lifecycle(&self, rules: &[LifecycleRule]) -> StateResult<()> {
        write_json_atomic(self.lifecycle_path(), &rules)
    }
}

fn validate_key(key: &str) -> StateResult<()> {
    let bad = key.is_empty()
        || key.starts_with('/')
        || key.ends_with('/')
        || key.split('/').any(|part| part.is_empty() || part == "." || part == "..");
    if bad {
        return Err(StateError::Config(format!("Invalid object key: '{}'", key)));
    }
    Ok(())
}

fn remove_if_exists(path: &Path) -> StateResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StateError::transient(path.display().to_string(), e)),
    }
}

fn collect_index_keys(base: &Path, dir: &Path, keys: &mut Vec<String>) -> StateResult<()> {
    if !dir.exists() {
        return Ok(());
    }
    let entries = fs::read_dir(dir).map_err(|e| StateError::transient(dir.display().to_string(), e))?;
    for entry in entries {
        let entry = entry.map_err(|e| StateError::transient(dir.display().to_string(), e))?;
        let path = entry.path();
        if path.is_dir() {
            collect_index_keys(base, &path, keys)?;
            continue;
        }
        let Some(relative) = path
            .strip_prefix(base)
            .ok()
            .and_then(|p| p.to_str())
            .and_then(|p| p.strip_suffix(".json"))
        else {
            continue;
        };
        keys.push(relative.replace(std::path::MAIN_SEPARATOR, "/"));
    }
    Ok(())
}
