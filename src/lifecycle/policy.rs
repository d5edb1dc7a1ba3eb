//! Retention policies for the two stores
//!
//! The live-state store keeps a few recent versions so the last mistake can be
//! undone. The backup store keeps everything for a long time so a disaster
//! discovered weeks later is still recoverable. Safety snapshots live outside
//! every rule's prefix and never expire.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::rules::{LifecycleCondition, LifecycleRule};
use crate::backup::BACKUP_PREFIX;
use crate::config::settings::{BackupRetention, LiveRetention};
use crate::error::StateResult;
use crate::store::ObjectStore;

/// Which store a policy is meant for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StoreRole {
    LiveState,
    Backups,
}

impl std::fmt::Display for StoreRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreRole::LiveState => write!(f, "live-state"),
            StoreRole::Backups => write!(f, "backups"),
        }
    }
}

/// A named rule set for one store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecyclePolicy {
    pub role: StoreRole,
    pub rules: Vec<LifecycleRule>,
}

impl LifecyclePolicy {
    /// Version-count and age rules on non-current live-state versions
    pub fn live_state(retention: &LiveRetention) -> Self {
        Self {
            role: StoreRole::LiveState,
            rules: vec![
                // The live version counts as a newer version, so keeping K
                // non-current versions means deleting at K + 1 newer ones.
                LifecycleRule::delete(LifecycleCondition {
                    num_newer_versions: Some(retention.max_noncurrent_versions + 1),
                    is_live: Some(false),
                    ..Default::default()
                }),
                LifecycleRule::delete(LifecycleCondition {
                    age_days: Some(retention.noncurrent_age_days),
                    is_live: Some(false),
                    ..Default::default()
                }),
            ],
        }
    }

    /// Age-only rule scoped to backup records
    pub fn backups(retention: &BackupRetention) -> Self {
        Self {
            role: StoreRole::Backups,
            rules: vec![LifecycleRule::delete(LifecycleCondition {
                age_days: Some(retention.age_days),
                matches_prefix: vec![BACKUP_PREFIX.to_string()],
                ..Default::default()
            })],
        }
    }
}

/// Result of declaring a policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Rules were written to the store
    Applied,
    /// The store already had exactly these rules
    Unchanged,
}

/// Declare a policy on a store; re-applying identical rules is a no-op
pub fn apply_policy(store: &dyn ObjectStore, policy: &LifecyclePolicy) -> StateResult<ApplyOutcome> {
    let current = store.lifecycle()?;
    if current == policy.rules {
        info!(role = %policy.role, "lifecycle rules already up to date");
        return Ok(ApplyOutcome::Unchanged);
    }

    store.set_lifecycle(&policy.rules)?;
    info!(role = %policy.role, rules = policy.rules.len(), "lifecycle rules applied");
    Ok(ApplyOutcome::Applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{LocalObjectStore, Versioning};
    use tempfile::TempDir;

    #[test]
    fn test_live_state_policy_rules() {
        let policy = LifecyclePolicy::live_state(&LiveRetention {
            max_noncurrent_versions: 5,
            noncurrent_age_days: 30,
        });

        assert_eq!(policy.role, StoreRole::LiveState);
        assert_eq!(policy.rules.len(), 2);
        assert_eq!(policy.rules[0].condition.num_newer_versions, Some(6));
        assert_eq!(policy.rules[1].condition.age_days, Some(30));
        assert!(policy
            .rules
            .iter()
            .all(|r| r.condition.is_live == Some(false)));
    }

    #[test]
    fn test_backup_policy_is_age_only() {
        let policy = LifecyclePolicy::backups(&BackupRetention { age_days: 90 });

        assert_eq!(policy.rules.len(), 1);
        let condition = &policy.rules[0].condition;
        assert_eq!(condition.age_days, Some(90));
        assert_eq!(condition.num_newer_versions, None);
        assert_eq!(condition.matches_prefix, vec![BACKUP_PREFIX.to_string()]);
    }

    #[test]
    fn test_apply_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let store = LocalObjectStore::open(temp.path().to_path_buf(), Versioning::Enabled);
        let policy = LifecyclePolicy::live_state(&LiveRetention::default());

        assert_eq!(apply_policy(&store, &policy).unwrap(), ApplyOutcome::Applied);
        assert_eq!(apply_policy(&store, &policy).unwrap(), ApplyOutcome::Unchanged);
        assert_eq!(store.lifecycle().unwrap(), policy.rules);
    }

    #[test]
    fn test_apply_replaces_changed_rules() {
        let temp = TempDir::new().unwrap();
        let store = LocalObjectStore::open(temp.path().to_path_buf(), Versioning::Disabled);

        apply_policy(&store, &LifecyclePolicy::backups(&BackupRetention { age_days: 90 })).unwrap();
        let outcome =
            apply_policy(&store, &LifecyclePolicy::backups(&BackupRetention { age_days: 30 })).unwrap();

        assert_eq!(outcome, ApplyOutcome::Applied);
        assert_eq!(store.lifecycle().unwrap()[0].condition.age_days, Some(30));
    }
}
