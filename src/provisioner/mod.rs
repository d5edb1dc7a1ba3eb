//! Provisioning tool collaborator
//!
//! The recovery flow needs four primitives from the infrastructure
//! provisioning tool: initialize against a namespace (taking the exclusive
//! state lock), pull, push, and list the resources recorded in the state.
//! [`StateBackend`] is that seam; [`LocalStateBackend`] implements it over a
//! [`LocalObjectStore`](crate::store::LocalObjectStore) with lock files.
//!
//! There is no ambient "current environment": every [`StateHandle`] is scoped
//! to the namespace it was initialized with and holds that namespace's lock
//! until it is dropped.

mod local;
mod resources;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StateResult;
use crate::store::ObjectMeta;

pub use local::LocalStateBackend;
pub use resources::resource_addresses;

/// Lock id reported for a lock file whose contents cannot be parsed
///
/// Pass it to `force-unlock` to clear such a lock.
pub const UNREADABLE_LOCK_ID: &str = "unreadable";

/// Who holds a state lock, and since when
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockInfo {
    /// Lock id an operator must quote to force-unlock
    pub id: String,
    pub namespace: String,
    /// Operation that took the lock (e.g. "recover")
    pub operation: String,
    pub holder: String,
    pub created_at: DateTime<Utc>,
}

/// Provisioning backend that can hand out locked, namespace-scoped handles
pub trait StateBackend {
    /// Initialize against `namespace`, acquiring its exclusive lock
    ///
    /// Fails with `StateLocked` if another operation holds the lock.
    fn init(&self, namespace: &str, operation: &str) -> StateResult<Box<dyn StateHandle + '_>>;

    /// Current lock on `namespace`, if any
    fn lock_info(&self, namespace: &str) -> StateResult<Option<LockInfo>>;

    /// Release a lock held by someone else; the caller must name its exact id
    fn force_unlock(&self, namespace: &str, lock_id: &str) -> StateResult<LockInfo>;
}

/// State operations on one initialized, locked namespace
pub trait StateHandle {
    fn namespace(&self) -> &str;

    /// The lock held by this handle
    fn lock(&self) -> &LockInfo;

    /// Current state content, `None` if the namespace has never been written
    fn pull(&self) -> StateResult<Option<Vec<u8>>>;

    /// Replace the live state with `content`
    fn push(&self, content: &[u8]) -> StateResult<ObjectMeta>;

    /// Addresses of the resources recorded in the live state
    fn list_resources(&self) -> StateResult<Vec<String>>;
}
