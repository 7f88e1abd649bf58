use std::path::PathBuf;

use agentsync_core::diff::SyncMode;
use clap::{ArgGroup, Parser, Subcommand};

/// Agent Configuration Synchronization Tool
///
/// Three-way sync of agentic coding tool configuration between a dotfiles
/// checkout and the live tool directories
#[derive(Parser, Debug)]
#[command(name = "agentsync")]
#[command(about, long_about = None, version)]
pub struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Use specific config file
    #[arg(long, global = true, value_name = "PATH", env = "AGENTSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Synchronize source and target trees
    #[command(group(ArgGroup::new("direction").args(["push", "pull", "bidirectional"])))]
    Sync {
        /// Propagate source changes to the target only
        #[arg(long)]
        push: bool,

        /// Propagate target changes to the source only
        #[arg(long)]
        pull: bool,

        /// Propagate both ways (default)
        #[arg(long)]
        bidirectional: bool,

        /// Only sync this tool
        #[arg(short, long, value_name = "NAME")]
        tool: Option<String>,

        /// Preview changes without executing
        #[arg(long)]
        dry_run: bool,

        /// Resolve conflicts by modification time without prompting
        #[arg(long)]
        auto: bool,
    },

    /// Show pending changes and conflicts without making changes
    Status {
        /// Only show this tool
        #[arg(short, long, value_name = "NAME")]
        tool: Option<String>,
    },

    /// List backups, newest first
    ListBackups {
        /// Only list backups of this tool
        #[arg(short, long, value_name = "NAME")]
        tool: Option<String>,
    },

    /// Restore every file of a backup
    Restore {
        /// Backup identifier as shown by list-backups
        backup_id: String,

        /// Restore even when a stored copy fails validation
        #[arg(short, long)]
        yes: bool,
    },

    /// Remove old backups
    CleanBackups {
        /// Remove backups older than this many days
        #[arg(long, value_name = "DAYS")]
        days: Option<u32>,

        /// Keep at most this many backups
        #[arg(long, value_name = "COUNT")]
        count: Option<usize>,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Write a commented starter configuration
    InitConfig {
        /// Destination (default: ~/.agentsync.yaml)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Forget this machine's baseline for a tool
    ResetState {
        /// Tool whose baseline is removed
        #[arg(short, long, value_name = "NAME")]
        tool: String,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

/// Sync mode selected by the direction flags
#[must_use]
pub const fn sync_mode(push: bool, pull: bool) -> SyncMode {
    if push {
        SyncMode::Push
    } else if pull {
        SyncMode::Pull
    } else {
        SyncMode::Bidirectional
    }
}
