//! Configuration types and structures

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// How a specially handled file participates in comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecialMode {
    /// Compare and sync only the listed JSON keys
    ExtractKeys,
}

/// Special handling rule for one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialHandling {
    /// Handling mode
    pub mode: SpecialMode,

    /// Keys (or dotted key paths) that participate in sync
    #[serde(default)]
    pub include_keys: Vec<String>,
}

/// Global engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct Settings {
    /// Backups older than this many days are removed by `clean`
    pub backup_retention_days: u32,

    /// At most this many backups are kept by `clean`
    pub backup_retention_count: usize,

    /// Clean backups after each successful sync
    pub auto_cleanup_backups: bool,

    /// Follow symlinks while scanning
    pub follow_symlinks: bool,

    /// Honour `.gitignore` files found in each tree
    pub respect_gitignore: bool,

    /// Ask before deleting anything from the source tree
    pub confirm_destructive_source: bool,

    /// Re-hash every written file and compare against the expected digest
    pub verify_after_write: bool,

    /// Pair deletes with creates of matching content
    pub detect_renames: bool,

    /// Minimum similarity for a rename pairing; `1.0` means identical content
    pub rename_similarity_threshold: f64,

    /// Root directory for backups
    pub backup_dir: PathBuf,

    /// Root directory for baselines; defaults to `<target parent>/.sync-state`
    pub state_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backup_retention_days: 30,
            backup_retention_count: 30,
            auto_cleanup_backups: true,
            follow_symlinks: false,
            respect_gitignore: true,
            confirm_destructive_source: true,
            verify_after_write: true,
            detect_renames: true,
            rename_similarity_threshold: 1.0,
            backup_dir: PathBuf::from("~/.agentsync/backups"),
            state_dir: None,
        }
    }
}

/// Per-tool sync configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Disabled tools are skipped by `sync` and `status`
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,

    /// Source tree (usually a dotfiles checkout)
    pub source: PathBuf,

    /// Target tree (usually the live `~/.tool` directory)
    pub target: PathBuf,

    /// Patterns to include; empty means everything
    #[serde(default)]
    pub include: Vec<String>,

    /// Patterns to exclude
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Named rulesets whose patterns are prepended to `exclude`
    #[serde(default)]
    pub exclude_rulesets: Vec<String>,

    /// Files with special comparison rules, keyed by relative path or file name
    #[serde(default)]
    pub special_handling: BTreeMap<String, SpecialHandling>,
}

const fn enabled_by_default() -> bool {
    true
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    /// Engine settings
    #[serde(default)]
    pub settings: Settings,

    /// Reusable exclude pattern lists
    #[serde(default)]
    pub exclude_rulesets: BTreeMap<String, Vec<String>>,

    /// Tools keyed by name
    #[serde(default)]
    pub tools: BTreeMap<String, ToolConfig>,
}

impl Config {
    /// Names of enabled tools in sorted order
    pub fn enabled_tools(&self) -> impl Iterator<Item = &str> {
        self.tools
            .iter()
            .filter(|(_, tool)| tool.enabled)
            .map(|(name, _)| name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.backup_retention_days, 30);
        assert_eq!(settings.backup_retention_count, 30);
        assert!(settings.confirm_destructive_source);
        assert!(!settings.follow_symlinks);
        assert!((settings.rename_similarity_threshold - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = r"
settings:
  follow_symlinks: true
tools:
  claude:
    source: /src
    target: /dst
    special_handling:
      settings.json:
        mode: extract_keys
        include_keys: [permissions]
";
        let config: Config = serde_yml::from_str(yaml).unwrap();

        assert!(config.settings.follow_symlinks);
        assert!(config.settings.respect_gitignore);
        let tool = &config.tools["claude"];
        assert!(tool.enabled);
        assert!(tool.include.is_empty());
        assert_eq!(
            tool.special_handling["settings.json"].mode,
            SpecialMode::ExtractKeys
        );
    }

    #[test]
    fn test_enabled_tools_sorted() {
        let yaml = r"
tools:
  zeta: { source: /a, target: /b }
  alpha: { source: /a, target: /b }
  off: { enabled: false, source: /a, target: /b }
";
        let config: Config = serde_yml::from_str(yaml).unwrap();
        let names: Vec<_> = config.enabled_tools().collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }
}
