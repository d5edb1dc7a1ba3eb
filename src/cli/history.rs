//! `history` and `config` commands

use super::Context;
use crate::environment::Environment;
use crate::error::{CommandOutcome, StateResult};

/// Print the most recent audit log entries, newest first
pub fn handle_history(ctx: &Context, limit: usize, environment: Option<&str>) -> StateResult<CommandOutcome> {
    let environment = environment.map(Environment::validate).transpose()?;
    let entries = ctx.audit.read_recent(limit, environment)?;

    if entries.is_empty() {
        println!("No operations recorded yet.");
        return Ok(CommandOutcome::Success);
    }

    for entry in entries.iter().rev() {
        println!("{}", entry.format_human_readable());
    }
    Ok(CommandOutcome::Success)
}

/// Show resolved paths and settings
pub fn handle_config(ctx: &Context) -> StateResult<CommandOutcome> {
    let settings = &ctx.settings;

    println!("statekeeper configuration");
    println!("=========================");
    println!("Base directory:    {}", ctx.paths.base_dir().display());
    println!("Settings file:     {}", ctx.paths.settings_file().display());
    println!("Audit log:         {}", ctx.paths.audit_log().display());
    println!("Live-state store:  {}", ctx.live.root().display());
    println!("Backup store:      {}", ctx.backups.root().display());
    println!();
    println!("Settings:");
    println!("  App name:        {}", settings.app_name);
    println!("  Operator:        {}", settings.operator);
    println!(
        "  Live retention:  {} non-current versions, {} days",
        settings.live_retention.max_noncurrent_versions, settings.live_retention.noncurrent_age_days
    );
    println!("  Backup retention: {} days", settings.backup_retention.age_days);
    Ok(CommandOutcome::Success)
}
