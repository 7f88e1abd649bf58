mod cli;
mod commands;
mod diff_view;
mod interactive;

use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use agentsync_core::MachineId;
use agentsync_core::sync::SyncOptions;
use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Log to stderr so stdout stays the report; `RUST_LOG` overrides the default level
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// First Ctrl+C finishes the running tool; a second one exits immediately
fn install_interrupt_handler() -> anyhow::Result<Arc<AtomicBool>> {
    let flag = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&flag);
    ctrlc::set_handler(move || {
        if handler_flag.swap(true, Ordering::SeqCst) {
            eprintln!("\n\nInterrupted by user (Ctrl+C)");
            std::process::exit(130); // Standard exit code for SIGINT
        }
        eprintln!("\nInterrupt received, stopping after the current tool (Ctrl+C again to quit)");
    })
    .context("Failed to set Ctrl+C handler")?;
    Ok(flag)
}

fn run(cli: &Cli) -> anyhow::Result<bool> {
    if let Commands::InitConfig { output, force } = &cli.command {
        return commands::InitConfig::execute(output.as_deref(), *force)
            .context("Failed to execute init-config command");
    }

    let machine = MachineId::detect();
    let engine = commands::load_engine(cli.config.as_deref(), machine)?;

    match &cli.command {
        Commands::Sync {
            push,
            pull,
            bidirectional: _,
            tool,
            dry_run,
            auto,
        } => {
            let engine = engine.with_interrupt(install_interrupt_handler()?);
            let options = SyncOptions {
                mode: cli::sync_mode(*push, *pull),
                dry_run: *dry_run,
                auto: *auto,
            };
            commands::SyncCommand::execute(&engine, tool.as_deref(), options)
                .context("Failed to execute sync command")
        }
        Commands::Status { tool } => commands::Status::execute(&engine, tool.as_deref())
            .context("Failed to execute status command"),
        Commands::ListBackups { tool } => commands::ListBackups::execute(&engine, tool.as_deref())
            .context("Failed to execute list-backups command"),
        Commands::Restore { backup_id, yes } => commands::Restore::execute(&engine, backup_id, *yes)
            .context("Failed to execute restore command"),
        Commands::CleanBackups { days, count, yes } => {
            commands::CleanBackups::execute(&engine, *days, *count, *yes)
                .context("Failed to execute clean-backups command")
        }
        Commands::ResetState { tool, yes } => commands::ResetState::execute(&engine, tool, *yes)
            .context("Failed to execute reset-state command"),
        Commands::InitConfig { .. } => Ok(true),
    }
}
