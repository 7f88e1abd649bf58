//! Configuration validation
//!
//! Collects every problem instead of stopping at the first one. Tool
//! directories are not checked here: a missing root fails only that tool's
//! scan.

use super::types::{Config, SpecialMode, ToolConfig};
use crate::error::{Error, Result};

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Create a new validator
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validate a configuration, returning all problems at once
    pub fn validate(config: &Config) -> Result<()> {
        let problems = Self::problems(config);
        if problems.is_empty() {
            Ok(())
        } else {
            Err(Error::InvalidConfig(problems))
        }
    }

    /// List every validation problem, in a stable order
    #[must_use]
    pub fn problems(config: &Config) -> Vec<String> {
        let mut problems = Vec::new();

        let threshold = config.settings.rename_similarity_threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            problems.push(format!(
                "settings.rename_similarity_threshold must be in (0, 1], got {threshold}"
            ));
        }

        for (name, patterns) in &config.exclude_rulesets {
            if patterns.iter().any(|p| p.trim().is_empty()) {
                problems.push(format!("exclude_rulesets.{name} contains an empty pattern"));
            }
        }

        if config.enabled_tools().next().is_none() {
            problems.push("no enabled tools configured".to_string());
        }

        for (name, tool) in &config.tools {
            Self::check_tool(config, name, tool, &mut problems);
        }

        problems
    }

    fn check_tool(config: &Config, name: &str, tool: &ToolConfig, problems: &mut Vec<String>) {
        if !is_simple_name(name) {
            problems.push(format!(
                "tool name '{name}' may only contain letters, digits, '-', '_' and '.'"
            ));
        }

        for ruleset in &tool.exclude_rulesets {
            if !config.exclude_rulesets.contains_key(ruleset) {
                problems.push(format!("tools.{name}: unknown exclude ruleset '{ruleset}'"));
            }
        }

        for (field, patterns) in [("include", &tool.include), ("exclude", &tool.exclude)] {
            if patterns.iter().any(|p| p.trim().is_empty()) {
                problems.push(format!("tools.{name}.{field} contains an empty pattern"));
            }
        }

        for (file, rule) in &tool.special_handling {
            match rule.mode {
                SpecialMode::ExtractKeys if rule.include_keys.is_empty() => {
                    problems.push(format!(
                        "tools.{name}.special_handling.{file}: extract_keys needs include_keys"
                    ));
                }
                SpecialMode::ExtractKeys => {}
            }
        }
    }
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// Names used as path components (tools, backup ids)
pub(crate) fn is_simple_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_valid_config() {
        let tmp = TempDir::new().unwrap();
        let yaml = format!(
            "tools:\n  claude: {{ source: {0}, target: {0} }}\n",
            tmp.path().display()
        );
        let config: Config = serde_yml::from_str(&yaml).unwrap();

        assert!(ConfigValidator::validate(&config).is_ok());
    }

    #[test]
    fn test_reports_every_problem() {
        let yaml = r#"
settings:
  rename_similarity_threshold: 1.5
tools:
  claude:
    source: /definitely/not/here
    target: /also/not/here
    include: [""]
    exclude_rulesets: [ghost]
    special_handling:
      settings.json: { mode: extract_keys }
"#;
        let config: Config = serde_yml::from_str(yaml).unwrap();

        let problems = ConfigValidator::problems(&config);

        assert_eq!(problems.len(), 4, "{problems:#?}");
        let err = ConfigValidator::validate(&config).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(ref list) if list.len() == 4));
    }

    #[test]
    fn test_no_enabled_tools() {
        let config = Config::default();
        let problems = ConfigValidator::problems(&config);
        assert!(problems.iter().any(|p| p.contains("no enabled tools")));
    }

    #[test]
    fn test_missing_tool_directory_is_not_a_config_problem() {
        let tmp = TempDir::new().unwrap();
        let yaml = format!(
            "tools:\n  live: {{ source: {0}, target: {0} }}\n  moved: {{ source: /gone, target: {0} }}\n",
            tmp.path().display()
        );
        let config: Config = serde_yml::from_str(&yaml).unwrap();

        assert!(ConfigValidator::problems(&config).is_empty());
    }

    #[test]
    fn test_simple_name() {
        assert!(is_simple_name("claude"));
        assert!(is_simple_name("open-code_2"));
        assert!(!is_simple_name("../etc"));
        assert!(!is_simple_name(".."));
        assert!(!is_simple_name(""));
    }
}
