//! Configuration loading, ruleset merging, pattern matching and validation
//!
//! This module handles:
//! - Config file discovery (`--config`, `AGENTSYNC_CONFIG`, `~/.agentsync.yaml`)
//! - YAML parsing with serde
//! - Per-tool resolution (home expansion, exclude rulesets, state location)
//! - Gitignore-style include/exclude matching
//! - Validation that reports every problem at once

mod discovery;
mod merge;
mod patterns;
mod types;
mod validation;

use std::fs;
use std::path::Path;

pub use discovery::{ConfigDiscovery, DEFAULT_FILE_NAME};
pub use merge::{ConfigMerger, ResolvedTool, STATE_DIR_NAME, expand_home};
pub use patterns::PatternMatcher;
pub use types::{Config, Settings, SpecialHandling, SpecialMode, ToolConfig};
pub use validation::ConfigValidator;
pub(crate) use validation::is_simple_name;

use crate::error::{Error, Result};

/// Commented starter configuration written by `init-config`
pub const TEMPLATE: &str = include_str!("../templates/config.yaml");

/// Configuration manager that coordinates discovery, parsing and validation
pub struct ConfigManager;

impl ConfigManager {
    /// Create a new configuration manager
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Locate, parse and validate the configuration
    pub fn load(explicit: Option<&Path>) -> Result<Config> {
        let path = ConfigDiscovery::locate(explicit)
            .ok_or_else(|| Error::Config("cannot determine home directory".to_string()))?;
        let config = Self::parse_file(&path)?;
        ConfigValidator::validate(&config)?;
        Ok(config)
    }

    /// Parse one file without validating it
    pub fn parse_file(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "cannot read {}: {e} (run `agentsync init-config` to create one)",
                path.display()
            ))
        })?;
        serde_yml::from_str(&content)
            .map_err(|e| Error::Config(format!("cannot parse {}: {e}", path.display())))
    }

    /// Write the starter template, refusing to overwrite unless `force`
    pub fn write_template(path: &Path, force: bool) -> Result<()> {
        if path.exists() && !force {
            return Err(Error::Config(format!(
                "{} already exists (use --force to overwrite)",
                path.display()
            )));
        }
        crate::fsutil::write_atomic(path, TEMPLATE.as_bytes())
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
