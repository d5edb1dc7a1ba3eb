//! statekeeper - backup and recovery of remote infrastructure state
//!
//! This library captures the live provisioning state of each deployment
//! environment into immutable, timestamped backups, restores a chosen backup
//! behind a confirmation gate and an automatic safety snapshot, and declares
//! retention rules on the stores holding both.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `environment`: the closed set of deployment environments
//! - `config`: Configuration and path management
//! - `error`: Custom error types and the tri-state command outcome
//! - `store`: Object storage interface and its filesystem implementation
//! - `provisioner`: Locked, namespace-scoped access to live state
//! - `backup`: Backup engine and the backup catalog
//! - `recovery`: Recovery state machine and confirmation providers
//! - `lifecycle`: Retention rules for both stores
//! - `audit`: Audit logging system
//! - `cli`: Command handlers
//!
//! # Example
//!
//! ```rust,ignore
//! use statekeeper::cli::Context;
//! use statekeeper::config::StatekeeperPaths;
//!
//! let ctx = Context::load(StatekeeperPaths::new()?)?;
//! let result = ctx.backup_engine().backup(&["production"]);
//! println!("{}", result.outcome());
//! ```

pub mod audit;
pub mod backup;
pub mod cli;
pub mod config;
pub mod environment;
pub mod error;
pub mod lifecycle;
pub mod provisioner;
pub mod recovery;
pub mod store;

pub use environment::Environment;
pub use error::{CommandOutcome, StateError, StateResult};
