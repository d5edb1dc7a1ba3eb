//! Recovery of live state from backups
//!
//! # Architecture
//!
//! - `RecoveryEngine`: lists backups and runs the gated, safety-first restore
//! - `Confirmation`: injected source of the `yes` token, so the engine never
//!   depends on a terminal
//!
//! # Example
//!
//! ```rust,ignore
//! use statekeeper::recovery::{RecoveryEngine, TerminalPrompt};
//!
//! let engine = RecoveryEngine::new("shop", &live, &backups, &backend).with_audit(&audit);
//! let report = engine.recover("staging", "shop-staging-20250101-120000", &TerminalPrompt)?;
//! if let Some(snapshot) = &report.safety_snapshot {
//!     println!("Previous state saved as {}", snapshot.key);
//! }
//! ```

mod confirm;
mod engine;

pub use confirm::{
    is_confirmed, Confirmation, ConfirmationRequest, PresuppliedToken, TerminalPrompt,
    CONFIRMATION_TOKEN,
};
pub use engine::{RecoveryEngine, RecoveryReport, RecoveryStage, RestoreSource};
