//! Declarative lifecycle rules
//!
//! Rules follow the object-storage convention: a rule fires when every
//! condition it specifies matches a given object version. Evaluation is the
//! store's job; this module only describes and matches.

use serde::{Deserialize, Serialize};

/// What happens to a version matched by a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleAction {
    Delete,
}

/// Conditions of a rule; unset conditions always match
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleCondition {
    /// Version is at least this many whole days old
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_days: Option<u32>,

    /// At least this many newer versions of the same object exist
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_newer_versions: Option<u32>,

    /// Restrict to the live version (`true`) or non-current versions (`false`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_live: Option<bool>,

    /// Restrict to keys starting with one of these prefixes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matches_prefix: Vec<String>,
}

/// One version of one object, as seen by rule evaluation
#[derive(Debug, Clone, Copy)]
pub struct VersionFacts<'a> {
    pub key: &'a str,
    pub is_live: bool,
    pub newer_versions: u32,
    pub age_days: i64,
}

impl LifecycleCondition {
    /// Whether every specified condition holds for this version
    pub fn matches(&self, facts: &VersionFacts<'_>) -> bool {
        if let Some(age) = self.age_days {
            if facts.age_days < i64::from(age) {
                return false;
            }
        }
        if let Some(newer) = self.num_newer_versions {
            if facts.newer_versions < newer {
                return false;
            }
        }
        if let Some(is_live) = self.is_live {
            if facts.is_live != is_live {
                return false;
            }
        }
        if !self.matches_prefix.is_empty()
            && !self
                .matches_prefix
                .iter()
                .any(|prefix| facts.key.starts_with(prefix.as_str()))
        {
            return false;
        }
        true
    }
}

/// A single lifecycle rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleRule {
    pub action: LifecycleAction,
    pub condition: LifecycleCondition,
}

impl LifecycleRule {
    /// Delete versions matching `condition`
    pub fn delete(condition: LifecycleCondition) -> Self {
        Self {
            action: LifecycleAction::Delete,
            condition,
        }
    }

    /// Human-readable description
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(is_live) = self.condition.is_live {
            parts.push(if is_live { "live" } else { "non-current" }.to_string());
        }
        if let Some(age) = self.condition.age_days {
            parts.push(format!("older than {} days", age));
        }
        if let Some(newer) = self.condition.num_newer_versions {
            parts.push(format!("with {}+ newer versions", newer));
        }
        if !self.condition.matches_prefix.is_empty() {
            parts.push(format!("under {}", self.condition.matches_prefix.join(", ")));
        }
        if parts.is_empty() {
            "delete every version".to_string()
        } else {
            format!("delete versions {}", parts.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facts(key: &str, is_live: bool, newer_versions: u32, age_days: i64) -> VersionFacts<'_> {
        VersionFacts {
            key,
            is_live,
            newer_versions,
            age_days,
        }
    }

    #[test]
    fn test_empty_condition_matches_everything() {
        let condition = LifecycleCondition::default();
        assert!(condition.matches(&facts("a", true, 0, 0)));
    }

    #[test]
    fn test_conditions_are_conjunctive() {
        let condition = LifecycleCondition {
            age_days: Some(30),
            is_live: Some(false),
            ..Default::default()
        };

        assert!(condition.matches(&facts("a", false, 1, 31)));
        assert!(!condition.matches(&facts("a", true, 0, 31)));
        assert!(!condition.matches(&facts("a", false, 1, 29)));
    }

    #[test]
    fn test_newer_versions_threshold() {
        let condition = LifecycleCondition {
            num_newer_versions: Some(3),
            ..Default::default()
        };
        assert!(!condition.matches(&facts("a", false, 2, 0)));
        assert!(condition.matches(&facts("a", false, 3, 0)));
    }

    #[test]
    fn test_prefix_scope() {
        let condition = LifecycleCondition {
            matches_prefix: vec!["backups/".into()],
            ..Default::default()
        };
        assert!(condition.matches(&facts("backups/shop-staging-20250101-000000/default.tfstate", true, 0, 0)));
        assert!(!condition.matches(&facts("safety/shop-staging-pre-restore/default.tfstate", true, 0, 0)));
    }

    #[test]
    fn test_describe() {
        let rule = LifecycleRule::delete(LifecycleCondition {
            age_days: Some(90),
            matches_prefix: vec!["backups/".into()],
            ..Default::default()
        });
        assert_eq!(rule.describe(), "delete versions older than 90 days, under backups/");
    }
}
