//! Recovery CLI commands
//!
//! Implements `recover`, `rollback` and `force-unlock`.

use super::{format_size, Context};
use crate::audit::{AuditEntry, Operation};
use crate::environment::Environment;
use crate::error::{CommandOutcome, StateResult};
use crate::provisioner::StateBackend;
use crate::recovery::{Confirmation, PresuppliedToken, RecoveryReport, TerminalPrompt};

fn confirmation(token: Option<String>) -> Box<dyn Confirmation> {
    match token {
        Some(token) => Box::new(PresuppliedToken(token)),
        None => Box::new(TerminalPrompt),
    }
}

/// Restore a backup over an environment's live state
pub fn handle_recover(
    ctx: &Context,
    environment: &str,
    backup_key: &str,
    confirm: Option<String>,
) -> StateResult<CommandOutcome> {
    let provider = confirmation(confirm);
    let report = ctx
        .recovery_engine()
        .recover(environment, backup_key, provider.as_ref())?;

    print_report("Restored", &report);
    Ok(CommandOutcome::Success)
}

/// Push a safety snapshot back over an environment's live state
pub fn handle_rollback(
    ctx: &Context,
    environment: &str,
    snapshot_key: &str,
    confirm: Option<String>,
) -> StateResult<CommandOutcome> {
    let provider = confirmation(confirm);
    let report = ctx
        .recovery_engine()
        .rollback(environment, snapshot_key, provider.as_ref())?;

    print_report("Rolled back to", &report);
    Ok(CommandOutcome::Success)
}

/// Release a stuck state lock, given its exact id
pub fn handle_force_unlock(ctx: &Context, environment: &str, lock_id: &str) -> StateResult<CommandOutcome> {
    let env = Environment::validate(environment)?;
    let namespace = env.namespace(ctx.app());

    match ctx.backend.force_unlock(&namespace, lock_id) {
        Ok(lock) => {
            ctx.audit.record(
                AuditEntry::succeeded(Operation::ForceUnlock, env, lock.id.clone()).with_detail(format!(
                    "held by {} for {} since {}",
                    lock.holder,
                    lock.operation,
                    lock.created_at.format("%Y-%m-%d %H:%M:%S UTC")
                )),
            );
            println!("Released lock {} on {}", lock.id, namespace);
            println!(
                "  was held by {} for '{}' since {}",
                lock.holder,
                lock.operation,
                lock.created_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
            Ok(CommandOutcome::Success)
        }
        Err(e) => {
            ctx.audit
                .record(AuditEntry::failed(Operation::ForceUnlock, env, lock_id, e.to_string()));
            Err(e)
        }
    }
}

fn print_report(verb: &str, report: &RecoveryReport) {
    println!("{} {} into {}", verb, report.source_key, report.namespace);

    match &report.safety_snapshot {
        Some(snapshot) => {
            println!(
                "Safety snapshot: {} ({})",
                snapshot.key,
                format_size(snapshot.size_bytes)
            );
            println!("  {}", snapshot.location);
        }
        None => println!("Safety snapshot: none (no previous state)"),
    }

    if let Some(count) = report.resource_count {
        println!("Resources in restored state: {}", count);
    }

    for warning in &report.warnings {
        println!("Warning: {}", warning);
    }

    if let Some(snapshot) = &report.safety_snapshot {
        println!();
        println!(
            "Undo with: statekeeper rollback {} {}",
            report.environment, snapshot.key
        );
    }
}
