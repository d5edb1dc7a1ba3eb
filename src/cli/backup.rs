//! Backup CLI commands
//!
//! Implements `backup`, `list-backups`, `list-snapshots` and `prune`.

use chrono::Utc;

use super::{format_duration, format_size, Context};
use crate::audit::{AuditEntry, Operation};
use crate::backup::{prune_artifact, resolve_artifact, ArtifactKind, BackupStatus};
use crate::environment::Environment;
use crate::error::{CommandOutcome, StateError, StateResult};
use crate::store::ObjectStore;

/// Back up one environment, or all of them when none is given
pub fn handle_backup(ctx: &Context, environment: Option<&str>) -> StateResult<CommandOutcome> {
    let requested: Vec<&str> = environment.into_iter().collect();
    let result = ctx.backup_engine().backup(&requested);

    for entry in &result.entries {
        match &entry.status {
            BackupStatus::BackedUp(record) => println!(
                "  {:<12} backed up   {} ({})",
                entry.identifier,
                record.key,
                format_size(record.size_bytes)
            ),
            BackupStatus::NotFound => {
                println!("  {:<12} no state    nothing to back up", entry.identifier)
            }
            BackupStatus::Failed(err) => {
                println!("  {:<12} FAILED      {}", entry.identifier, err)
            }
        }
    }

    let outcome = result.outcome();
    println!();
    println!(
        "{} backed up, {} without state, {} failed ({})",
        result.success_count(),
        result.not_found().len(),
        result.failure_count(),
        outcome
    );
    Ok(outcome)
}

/// List backup records of an environment, newest first
pub fn handle_list_backups(ctx: &Context, environment: &str) -> StateResult<CommandOutcome> {
    let records = ctx.recovery_engine().list_backups(environment)?;

    if records.is_empty() {
        println!("No backups found for {}.", environment);
        println!("Create one with: statekeeper backup {}", environment);
        return Ok(CommandOutcome::Success);
    }

    println!("Backups for {}", environment);
    println!("============{}", "=".repeat(environment.len()));
    println!();

    let now = Utc::now();
    for (i, record) in records.iter().enumerate() {
        println!(
            "  {}. {} ({} ago, {})",
            i + 1,
            record.key,
            format_duration(now.signed_duration_since(record.captured_at)),
            format_size(record.size_bytes),
        );
    }

    println!();
    println!("Total: {} backup(s)", records.len());
    Ok(CommandOutcome::Success)
}

/// List safety snapshots of an environment, newest first
pub fn handle_list_snapshots(ctx: &Context, environment: &str) -> StateResult<CommandOutcome> {
    let snapshots = ctx.recovery_engine().list_safety_snapshots(environment)?;

    if snapshots.is_empty() {
        println!("No safety snapshots for {}.", environment);
        return Ok(CommandOutcome::Success);
    }

    println!("Safety snapshots for {}", environment);
    println!();

    let now = Utc::now();
    for snapshot in &snapshots {
        println!(
            "  {} ({} ago, {})",
            snapshot.key,
            format_duration(now.signed_duration_since(snapshot.taken_at)),
            format_size(snapshot.size_bytes),
        );
        println!("    {}", snapshot.location);
    }

    println!();
    println!("Undo a restore with: statekeeper rollback {} <SNAPSHOT_KEY>", environment);
    Ok(CommandOutcome::Success)
}

/// Delete one backup record or safety snapshot
pub fn handle_prune(
    ctx: &Context,
    environment: &str,
    key: &str,
    force: bool,
) -> StateResult<CommandOutcome> {
    let env = Environment::validate(environment)?;

    if !force {
        let (kind, object_key) = resolve_artifact(ctx.app(), env, key)?;
        if !ctx.backups.exists(&object_key)? {
            return Err(match kind {
                ArtifactKind::Backup => StateError::BackupNotFound {
                    environment: env.to_string(),
                    backup_key: key.to_string(),
                },
                ArtifactKind::SafetySnapshot => StateError::snapshot_not_found(key),
            });
        }
        println!("Would delete {} {}", kind, key);
        println!("  {}", ctx.backups.location(&object_key));
        println!();
        println!("To delete it, run again with --force flag:");
        println!("  statekeeper prune {} {} --force", environment, key);
        return Ok(CommandOutcome::Success);
    }

    match prune_artifact(&ctx.backups, ctx.app(), env, key) {
        Ok(pruned) => {
            ctx.audit.record(
                AuditEntry::succeeded(Operation::Prune, env, pruned.key.clone())
                    .with_detail(pruned.kind.to_string()),
            );
            println!("Deleted {} {}", pruned.kind, pruned.key);
            Ok(CommandOutcome::Success)
        }
        Err(e) => {
            ctx.audit
                .record(AuditEntry::failed(Operation::Prune, env, key, e.to_string()));
            Err(e)
        }
    }
}
