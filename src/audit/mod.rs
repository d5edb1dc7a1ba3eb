//! Audit logging system for statekeeper
//!
//! Records every backup, safety snapshot, restore, rollback, prune, lifecycle
//! change and force-unlock in an append-only audit log.
//!
//! # Architecture
//!
//! - `AuditEntry`: a single entry with timestamp, operation, environment, the
//!   artifact key involved and how the operation ended.
//! - `AuditLogger`: writes entries to the audit log file using a
//!   line-delimited JSON format (JSONL).
//!
//! # Example
//!
//! ```rust,ignore
//! use statekeeper::audit::{AuditEntry, AuditLogger, Operation};
//! use statekeeper::environment::Environment;
//!
//! let logger = AuditLogger::new(paths.audit_log());
//! logger.log(&AuditEntry::succeeded(
//!     Operation::Backup,
//!     Environment::Staging,
//!     "shop-staging-20250101-120000",
//! ))?;
//! ```

mod entry;
mod logger;

pub use entry::{AuditEntry, AuditStatus, Operation};
pub use logger::AuditLogger;
