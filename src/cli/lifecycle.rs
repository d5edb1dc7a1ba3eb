//! Lifecycle CLI commands

use chrono::Utc;
use clap::Subcommand;
use tracing::warn;

use super::Context;
use crate::audit::{AuditEntry, AuditStatus, Operation};
use crate::error::{CommandOutcome, StateResult};
use crate::lifecycle::{apply_policy, ApplyOutcome, LifecyclePolicy};
use crate::store::{LocalObjectStore, ObjectStore};

/// Lifecycle subcommands
#[derive(Subcommand)]
pub enum LifecycleCommands {
    /// Show the configured rules and whether each store has them
    Show {
        /// Print the rule sets as JSON
        #[arg(long)]
        json: bool,
    },

    /// Declare the configured rules on both stores
    Apply,

    /// Expire versions matching the declared rules now
    Sweep,
}

/// Handle a lifecycle command
pub fn handle_lifecycle_command(ctx: &Context, cmd: LifecycleCommands) -> StateResult<CommandOutcome> {
    let targets = [
        (&ctx.live, LifecyclePolicy::live_state(&ctx.settings.live_retention)),
        (&ctx.backups, LifecyclePolicy::backups(&ctx.settings.backup_retention)),
    ];

    match cmd {
        LifecycleCommands::Show { json } => {
            if json {
                let policies: Vec<&LifecyclePolicy> = targets.iter().map(|(_, p)| p).collect();
                println!("{}", serde_json::to_string_pretty(&policies)?);
                return Ok(CommandOutcome::Success);
            }

            for (store, policy) in &targets {
                let declared = store.lifecycle()?;
                let status = if declared == policy.rules {
                    "applied"
                } else if declared.is_empty() {
                    "not applied"
                } else {
                    "differs, run 'statekeeper lifecycle apply'"
                };

                println!("{} store ({})", policy.role, store.root().display());
                for rule in &policy.rules {
                    println!("  - {}", rule.describe());
                }
                println!("  status: {}", status);
                println!();
            }
            Ok(CommandOutcome::Success)
        }

        LifecycleCommands::Apply => {
            let mut failures = 0;
            for (store, policy) in &targets {
                let artifact = format!("{} store", policy.role);
                match apply_policy(*store, policy) {
                    Ok(outcome) => {
                        let (label, status) = match outcome {
                            ApplyOutcome::Applied => ("applied", AuditStatus::Succeeded),
                            ApplyOutcome::Unchanged => ("already up to date", AuditStatus::Skipped),
                        };
                        ctx.audit.record(AuditEntry::new(Operation::LifecycleApply, None, artifact, status));
                        println!("{} store: {}", policy.role, label);
                    }
                    Err(e) => {
                        failures += 1;
                        warn!(role = %policy.role, error = %e, "lifecycle apply failed");
                        ctx.audit.record(
                            AuditEntry::new(Operation::LifecycleApply, None, artifact, AuditStatus::Failed)
                                .with_detail(e.to_string()),
                        );
                        println!("{} store: FAILED {}", policy.role, e);
                    }
                }
            }
            Ok(outcome_for(failures, targets.len()))
        }

        LifecycleCommands::Sweep => {
            let now = Utc::now();
            let mut failures = 0;
            for (store, policy) in &targets {
                let artifact = format!("{} store", policy.role);
                match sweep(store, now) {
                    Ok(deleted) => {
                        ctx.audit.record(
                            AuditEntry::new(Operation::LifecycleSweep, None, artifact, AuditStatus::Succeeded)
                                .with_detail(format!("{} version(s) expired", deleted.len())),
                        );
                        println!("{} store: {} version(s) expired", policy.role, deleted.len());
                        for line in deleted {
                            println!("  {}", line);
                        }
                    }
                    Err(e) => {
                        failures += 1;
                        ctx.audit.record(
                            AuditEntry::new(Operation::LifecycleSweep, None, artifact, AuditStatus::Failed)
                                .with_detail(e.to_string()),
                        );
                        println!("{} store: FAILED {}", policy.role, e);
                    }
                }
            }
            Ok(outcome_for(failures, targets.len()))
        }
    }
}

fn sweep(store: &LocalObjectStore, now: chrono::DateTime<Utc>) -> StateResult<Vec<String>> {
    let report = store.sweep_lifecycle(now)?;
    Ok(report
        .deleted
        .into_iter()
        .map(|(key, generation, was_live)| {
            let which = if was_live { "live" } else { "non-current" };
            format!("{}#{} ({})", key, generation, which)
        })
        .collect())
}

fn outcome_for(failures: usize, total: usize) -> CommandOutcome {
    if failures == 0 {
        CommandOutcome::Success
    } else if failures == total {
        CommandOutcome::HardFailure
    } else {
        CommandOutcome::PartialFailure
    }
}
