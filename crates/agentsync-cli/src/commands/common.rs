//! Shared helpers for command execution

use std::path::Path;

use agentsync_core::MachineId;
use agentsync_core::config::ConfigManager;
use agentsync_core::sync::SyncEngine;
use anyhow::Context;
use dialoguer::Confirm;

/// Load and validate the configuration and build an engine for this machine
pub fn load_engine(config_path: Option<&Path>, machine: MachineId) -> anyhow::Result<SyncEngine> {
    let config = ConfigManager::load(config_path).context("Failed to load configuration")?;
    tracing::debug!(machine = %machine, tools = config.tools.len(), "configuration loaded");
    Ok(SyncEngine::new(config, machine))
}

/// Ask a yes/no question; `assume_yes` skips the prompt
pub fn confirm(prompt: &str, assume_yes: bool) -> anyhow::Result<bool> {
    if assume_yes {
        return Ok(true);
    }
    Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .context("Failed to show prompt (use --yes when not running in a terminal)")
}
