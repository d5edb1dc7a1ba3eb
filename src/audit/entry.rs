//! Audit entry data structures
//!
//! Defines the operations that are audited and the entry format itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::environment::Environment;

/// Types of operations that can be audited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Operation {
    /// Live state copied into a backup record
    Backup,
    /// Live state copied into a safety snapshot before a restore
    SafetySnapshot,
    /// Backup pushed over live state
    Restore,
    /// Safety snapshot pushed back over live state
    Rollback,
    /// Lifecycle rules declared on a store
    LifecycleApply,
    /// Lifecycle rules evaluated against a store
    LifecycleSweep,
    /// Backup or snapshot deleted by an operator
    Prune,
    /// State lock released by an operator
    ForceUnlock,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Backup => write!(f, "BACKUP"),
            Operation::SafetySnapshot => write!(f, "SAFETY-SNAPSHOT"),
            Operation::Restore => write!(f, "RESTORE"),
            Operation::Rollback => write!(f, "ROLLBACK"),
            Operation::LifecycleApply => write!(f, "LIFECYCLE-APPLY"),
            Operation::LifecycleSweep => write!(f, "LIFECYCLE-SWEEP"),
            Operation::Prune => write!(f, "PRUNE"),
            Operation::ForceUnlock => write!(f, "FORCE-UNLOCK"),
        }
    }
}

/// How the audited operation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditStatus {
    Succeeded,
    Skipped,
    Failed,
}

impl std::fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuditStatus::Succeeded => write!(f, "ok"),
            AuditStatus::Skipped => write!(f, "skipped"),
            AuditStatus::Failed => write!(f, "FAILED"),
        }
    }
}

/// A single audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// When the operation occurred (UTC)
    pub timestamp: DateTime<Utc>,

    /// Type of operation performed
    pub operation: Operation,

    /// Environment affected, if the operation is environment-scoped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<Environment>,

    /// Artifact the operation produced or consumed (backup key, snapshot key, lock id, store)
    pub artifact: String,

    pub status: AuditStatus,

    /// Free-form detail (error text, counts)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl AuditEntry {
    /// Create an entry stamped with the current time
    pub fn new(
        operation: Operation,
        environment: Option<Environment>,
        artifact: impl Into<String>,
        status: AuditStatus,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            operation,
            environment,
            artifact: artifact.into(),
            status,
            detail: None,
        }
    }

    /// Successful operation on an environment
    pub fn succeeded(operation: Operation, environment: Environment, artifact: impl Into<String>) -> Self {
        Self::new(operation, Some(environment), artifact, AuditStatus::Succeeded)
    }

    /// Failed operation on an environment, with the error text
    pub fn failed(
        operation: Operation,
        environment: Environment,
        artifact: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::new(operation, Some(environment), artifact, AuditStatus::Failed).with_detail(reason)
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Format the entry for human-readable output
    pub fn format_human_readable(&self) -> String {
        let mut output = format!(
            "[{}] {} {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            self.operation,
            self.status,
        );

        if let Some(env) = &self.environment {
            output.push_str(&format!(" {}", env));
        }

        output.push_str(&format!(" {}", self.artifact));

        if let Some(detail) = &self.detail {
            output.push_str(&format!("\n  {}", detail));
        }

        output
    }
}
