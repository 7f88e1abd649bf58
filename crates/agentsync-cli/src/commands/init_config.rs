use std::path::Path;

use agentsync_core::config::{ConfigDiscovery, ConfigManager};
use anyhow::Context;

pub struct InitConfig;

impl InitConfig {
    pub fn execute(output: Option<&Path>, force: bool) -> anyhow::Result<bool> {
        let path = match output {
            Some(path) => path.to_path_buf(),
            None => ConfigDiscovery::default_path().context("Failed to determine home directory")?,
        };
        ConfigManager::write_template(&path, force)?;
        println!("Wrote starter configuration to {}", path.display());
        Ok(true)
    }
}
