//! Retention & lifecycle management
//!
//! Declares expiration rules on the live-state store and the backup store.
//! The stores evaluate the rules on their own schedule; this module only
//! describes them and applies them idempotently.
//!
//! # Example
//!
//! ```rust,ignore
//! use statekeeper::lifecycle::{apply_policy, LifecyclePolicy};
//!
//! let policy = LifecyclePolicy::backups(&settings.backup_retention);
//! apply_policy(&backup_store, &policy)?;
//! ```

mod policy;
mod rules;

pub use policy::{apply_policy, ApplyOutcome, LifecyclePolicy, StoreRole};
pub use rules::{LifecycleAction, LifecycleCondition, LifecycleRule, VersionFacts};
