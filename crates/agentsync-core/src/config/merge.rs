//! Per-tool resolution: ruleset merging, home expansion, state location.
//!
//! # Merging Semantics
//!
//! - **Excludes**: referenced rulesets first (in reference order), then the
//!   tool's own patterns
//! - **Paths**: a leading `~` expands to the home directory
//! - **State root**: `settings.state_dir` when set, else `.sync-state` next to
//!   the target directory

use std::path::{Path, PathBuf};

use super::types::{Config, Settings, ToolConfig};
use crate::error::{Error, Result};
use crate::scanner::SpecialRules;

/// Directory name of the default state root
pub const STATE_DIR_NAME: &str = ".sync-state";

/// A tool with every path expanded and every ruleset applied
#[derive(Debug, Clone)]
pub struct ResolvedTool {
    /// Tool name (also the state and backup key)
    pub name: String,
    /// Source tree root
    pub source: PathBuf,
    /// Target tree root
    pub target: PathBuf,
    /// Include patterns
    pub include: Vec<String>,
    /// Rulesets followed by tool excludes
    pub exclude: Vec<String>,
    /// Special handling lookup
    pub special: SpecialRules,
    /// Directory holding `<tool>/<machine>.json`
    pub state_root: PathBuf,
}

/// Configuration merger
pub struct ConfigMerger;

impl ConfigMerger {
    /// Create a new config merger
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Resolve one named tool
    pub fn resolve(config: &Config, name: &str) -> Result<ResolvedTool> {
        let tool = config
            .tools
            .get(name)
            .ok_or_else(|| Error::Config(format!("Unknown tool '{name}'")))?;
        Self::resolve_tool(config, name, tool)
    }

    fn resolve_tool(config: &Config, name: &str, tool: &ToolConfig) -> Result<ResolvedTool> {
        let mut exclude = Vec::new();
        for ruleset in &tool.exclude_rulesets {
            let patterns = config.exclude_rulesets.get(ruleset).ok_or_else(|| {
                Error::Config(format!("Tool '{name}' references unknown ruleset '{ruleset}'"))
            })?;
            exclude.extend(patterns.iter().cloned());
        }
        exclude.extend(tool.exclude.iter().cloned());

        let target = expand_home(&tool.target);
        Ok(ResolvedTool {
            name: name.to_string(),
            source: expand_home(&tool.source),
            state_root: state_root(&config.settings, &target),
            target,
            include: tool.include.clone(),
            exclude,
            special: SpecialRules::new(tool.special_handling.clone()),
        })
    }
}

impl Default for ConfigMerger {
    fn default() -> Self {
        Self::new()
    }
}

fn state_root(settings: &Settings, target: &Path) -> PathBuf {
    settings.state_dir.as_deref().map_or_else(
        || {
            target
                .parent()
                .unwrap_or(target)
                .join(STATE_DIR_NAME)
        },
        expand_home,
    )
}

/// Expand a leading `~` to the user's home directory
#[must_use]
pub fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    dirs::home_dir().map_or_else(|| path.to_path_buf(), |home| home.join(rest))
}
