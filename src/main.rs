use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use statekeeper::cli::{
    handle_backup, handle_config, handle_force_unlock, handle_history, handle_lifecycle_command,
    handle_list_backups, handle_list_snapshots, handle_prune, handle_recover, handle_rollback,
    Context, LifecycleCommands,
};
use statekeeper::config::StatekeeperPaths;
use statekeeper::CommandOutcome;

#[derive(Parser)]
#[command(
    name = "statekeeper",
    version,
    about = "Backup and recovery of remote infrastructure state",
    long_about = "statekeeper keeps timestamped backups of each environment's \
                  provisioning state, restores them behind a confirmation gate \
                  with an automatic safety snapshot, and manages retention rules \
                  on the state and backup stores."
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Back up one environment, or all of them
    Backup {
        /// development, staging or production
        environment: Option<String>,
    },

    /// List backups of an environment, newest first
    #[command(alias = "ls")]
    ListBackups {
        environment: String,
    },

    /// Restore a backup over an environment's live state
    Recover {
        environment: String,
        /// Backup key as shown by list-backups
        backup_key: String,
        /// Confirmation token; anything but 'yes' cancels
        #[arg(long, env = "STATEKEEPER_CONFIRM")]
        confirm: Option<String>,
    },

    /// Push a safety snapshot back over an environment's live state
    Rollback {
        environment: String,
        /// Safety snapshot key as shown by list-snapshots
        snapshot_key: String,
        /// Confirmation token; anything but 'yes' cancels
        #[arg(long, env = "STATEKEEPER_CONFIRM")]
        confirm: Option<String>,
    },

    /// List safety snapshots of an environment, newest first
    ListSnapshots {
        environment: String,
    },

    /// Delete one backup or safety snapshot
    Prune {
        environment: String,
        key: String,
        /// Skip the dry run and delete
        #[arg(short, long)]
        force: bool,
    },

    /// Release a stuck state lock
    ForceUnlock {
        environment: String,
        /// Lock id as reported by the locked operation ('unreadable' for a corrupt lock file)
        lock_id: String,
    },

    /// Retention rule management
    #[command(subcommand)]
    Lifecycle(LifecycleCommands),

    /// Show recent operations from the audit log
    History {
        /// Only show operations on this environment
        #[arg(short, long)]
        environment: Option<String>,
        /// Number of entries to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Show current configuration and paths
    Config,
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("statekeeper={level}")));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let paths = StatekeeperPaths::new()?;
    let ctx = Context::load(paths)?;

    let result = match cli.command {
        Commands::Backup { environment } => handle_backup(&ctx, environment.as_deref()),
        Commands::ListBackups { environment } => handle_list_backups(&ctx, &environment),
        Commands::Recover {
            environment,
            backup_key,
            confirm,
        } => handle_recover(&ctx, &environment, &backup_key, confirm),
        Commands::Rollback {
            environment,
            snapshot_key,
            confirm,
        } => handle_rollback(&ctx, &environment, &snapshot_key, confirm),
        Commands::ListSnapshots { environment } => handle_list_snapshots(&ctx, &environment),
        Commands::Prune {
            environment,
            key,
            force,
        } => handle_prune(&ctx, &environment, &key, force),
        Commands::ForceUnlock {
            environment,
            lock_id,
        } => handle_force_unlock(&ctx, &environment, &lock_id),
        Commands::Lifecycle(cmd) => handle_lifecycle_command(&ctx, cmd),
        Commands::History { environment, limit } => {
            handle_history(&ctx, limit, environment.as_deref())
        }
        Commands::Config => handle_config(&ctx),
    };

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("Error: {}", e);
            e.outcome()
        }
    };

    if outcome != CommandOutcome::Success {
        std::process::exit(outcome.exit_code());
    }
    Ok(())
}
