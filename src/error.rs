//! Custom error types for statekeeper
//!
//! This module defines the error hierarchy for the application using thiserror
//! for ergonomic error definitions. Every variant that can follow a destructive
//! step names the artifact an operator needs for manual remediation.

use thiserror::Error;

/// Tri-state outcome of a command
///
/// Callers must treat `PartialFailure` differently from `HardFailure`: some
/// environments still need attention, but not everything failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Everything requested completed
    Success,
    /// Some environments failed while others succeeded
    PartialFailure,
    /// Validation or safety-step failure; no destructive action was taken
    HardFailure,
}

impl CommandOutcome {
    /// Process exit code for this outcome
    pub fn exit_code(self) -> i32 {
        match self {
            CommandOutcome::Success => 0,
            CommandOutcome::HardFailure => 1,
            CommandOutcome::PartialFailure => 2,
        }
    }
}

impl std::fmt::Display for CommandOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandOutcome::Success => write!(f, "success"),
            CommandOutcome::PartialFailure => write!(f, "partial failure"),
            CommandOutcome::HardFailure => write!(f, "hard failure"),
        }
    }
}

/// The main error type for statekeeper operations
#[derive(Error, Debug)]
pub enum StateError {
    /// Identifier is not one of the known environments
    #[error("Invalid environment '{0}': expected one of development, staging, production")]
    InvalidEnvironment(String),

    /// Target never existed
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    /// Network, permission or quota failure talking to a collaborator
    #[error("Transient I/O failure on {target}: {reason}")]
    TransientIo { target: String, reason: String },

    /// Listing found nothing to restore from
    #[error("No backups available for environment '{environment}'")]
    NoBackupsAvailable { environment: String },

    /// The selected backup key does not exist
    #[error("Backup not found: {backup_key} (run 'statekeeper list-backups {environment}')")]
    BackupNotFound {
        environment: String,
        backup_key: String,
    },

    /// Operator declined the confirmation gate
    #[error("Recovery of {namespace} cancelled: confirmation token was not 'yes'")]
    RecoveryCancelled { namespace: String },

    /// Safety snapshot could not be written; live state untouched
    #[error("Safety backup of {namespace} to {snapshot_key} failed, live state untouched: {reason}")]
    SafetyBackupFailed {
        namespace: String,
        snapshot_key: String,
        reason: String,
    },

    /// Provisioning backend could not be initialized; live state untouched
    #[error("Backend init for {namespace} failed, live state untouched{}: {reason}", safety_hint(.safety_snapshot))]
    BackendInitFailed {
        namespace: String,
        safety_snapshot: Option<String>,
        reason: String,
    },

    /// Another operation holds the state lock
    #[error(
        "State for {namespace} is locked by {holder} (lock id {lock_id}); wait for it to finish \
         or run 'statekeeper force-unlock <environment> {lock_id}' if you are sure it is stale"
    )]
    StateLocked {
        namespace: String,
        lock_id: String,
        holder: String,
    },

    /// Someone wrote the live state between the safety snapshot and the lock
    #[error(
        "Live state of {namespace} changed after its safety snapshot was taken; restore aborted, \
         live state untouched{}. Run the restore again to snapshot the current state",
        unused_snapshot_hint(.safety_snapshot)
    )]
    LiveStateChanged {
        namespace: String,
        safety_snapshot: Option<String>,
    },

    /// Writing the selected backup over live state failed
    #[error(
        "Restore of {backup_key} into {namespace} failed: {reason}. Live state may not match \
         the backup{}",
        safety_hint(.safety_snapshot)
    )]
    RestoreFailed {
        namespace: String,
        backup_key: String,
        safety_snapshot: Option<String>,
        reason: String,
    },

    /// Force-unlock was asked for a lock that is not held under that id
    #[error("No lock with id {lock_id} is held on {namespace}")]
    LockNotHeld { namespace: String, lock_id: String },

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),
}

fn safety_hint(safety_snapshot: &Option<String>) -> String {
    match safety_snapshot {
        Some(key) => format!(
            "; safety snapshot {} is intact (undo with 'statekeeper rollback <environment> {}')",
            key, key
        ),
        None => String::new(),
    }
}

fn unused_snapshot_hint(safety_snapshot: &Option<String>) -> String {
    match safety_snapshot {
        Some(key) => format!(" (safety snapshot {} no longer matches it)", key),
        None => String::new(),
    }
}

impl StateError {
    /// Create a "not found" error for stored objects
    pub fn object_not_found(key: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Object",
            identifier: key.into(),
        }
    }

    /// Create a "not found" error for safety snapshots
    pub fn snapshot_not_found(key: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Safety snapshot",
            identifier: key.into(),
        }
    }

    /// Wrap a collaborator failure on a named target
    pub fn transient(target: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::TransientIo {
            target: target.into(),
            reason: reason.to_string(),
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if live state may have been modified by the failed operation
    pub fn is_destructive(&self) -> bool {
        matches!(self, Self::RestoreFailed { .. })
    }

    /// How a command that ended with this error should be reported
    pub fn outcome(&self) -> CommandOutcome {
        CommandOutcome::HardFailure
    }
}

// Implement From traits for common error types

impl From<std::io::Error> for StateError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for StateError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

/// Result type alias for statekeeper operations
pub type StateResult<T> = Result<T, StateError>;
