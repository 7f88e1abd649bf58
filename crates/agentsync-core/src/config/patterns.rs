//! Gitignore-style pattern matching using the ignore crate

use std::path::{Path, PathBuf};

use ignore::gitignore::{Gitignore, GitignoreBuilder};

use crate::error::{Error, Result};

/// Include/exclude matcher for relative paths inside one tree
#[derive(Debug, Default)]
pub struct PatternMatcher {
    include: Option<Gitignore>,
    exclude: Option<Gitignore>,
    /// `.gitignore` files found so far, keyed by their directory; ancestors
    /// always precede descendants
    gitignores: Vec<(PathBuf, Gitignore)>,
}

fn build(patterns: &[String]) -> Result<Option<Gitignore>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GitignoreBuilder::new("");
    for pattern in patterns {
        builder
            .add_line(None, pattern)
            .map_err(|e| Error::Pattern {
                pattern: pattern.clone(),
                reason: e.to_string(),
            })?;
    }
    let compiled = builder.build().map_err(|e| Error::Pattern {
        pattern: patterns.join(", "),
        reason: e.to_string(),
    })?;
    Ok(Some(compiled))
}

impl PatternMatcher {
    /// Matcher that includes everything
    #[must_use]
    pub const fn new() -> Self {
        Self {
            include: None,
            exclude: None,
            gitignores: Vec::new(),
        }
    }

    /// Build a matcher from include and exclude patterns
    ///
    /// An empty include list includes every path.
    pub fn with_patterns(include: &[String], exclude: &[String]) -> Result<Self> {
        Ok(Self {
            include: build(include)?,
            exclude: build(exclude)?,
            gitignores: Vec::new(),
        })
    }

    /// Add the rules of `<root>/<dir>/.gitignore`, if it exists.
    ///
    /// The rules only apply below `dir`. Directories must be added parent
    /// first, which a depth-first walk does naturally.
    pub fn add_gitignore(&mut self, root: &Path, dir: &Path) {
        let base = root.join(dir);
        let path = base.join(".gitignore");
        if !path.is_file() {
            return;
        }
        let mut builder = GitignoreBuilder::new(&base);
        if let Some(err) = builder.add(&path) {
            tracing::warn!(path = %path.display(), error = %err, "ignoring unreadable .gitignore");
            return;
        }
        match builder.build() {
            Ok(gitignore) => self.gitignores.push((dir.to_path_buf(), gitignore)),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "ignoring invalid .gitignore");
            }
        }
    }

    /// The deepest `.gitignore` with an opinion on `path` decides
    fn gitignored(&self, path: &Path, is_dir: bool) -> bool {
        self.gitignores
            .iter()
            .rev()
            .filter_map(|(dir, gi)| {
                let rel = path.strip_prefix(dir).ok()?;
                (!rel.as_os_str().is_empty()).then(|| gi.matched_path_or_any_parents(rel, is_dir))
            })
            .find(|verdict| !verdict.is_none())
            .is_some_and(|verdict| verdict.is_ignore())
    }

    /// Whether a relative path (or one of its parents) is excluded
    #[must_use]
    pub fn is_excluded(&self, path: &Path, is_dir: bool) -> bool {
        self.exclude
            .as_ref()
            .is_some_and(|gi| gi.matched_path_or_any_parents(path, is_dir).is_ignore())
            || self.gitignored(path, is_dir)
    }

    /// Whether a relative file path should be scanned
    #[must_use]
    pub fn should_include(&self, path: &Path) -> bool {
        let included = self.include.as_ref().is_none_or(|gi| {
            gi.matched_path_or_any_parents(path, false).is_ignore()
        });
        included && !self.is_excluded(path, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn patterns(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_no_patterns() {
        let matcher = PatternMatcher::new();
        assert!(matcher.should_include(&PathBuf::from("any/file.txt")));
    }

    #[test]
    fn test_exclude_pattern() {
        let matcher = PatternMatcher::with_patterns(&[], &patterns(&["*.tmp"])).unwrap();

        assert!(!matcher.should_include(&PathBuf::from("file.tmp")));
        assert!(!matcher.should_include(&PathBuf::from("deep/file.tmp")));
        assert!(matcher.should_include(&PathBuf::from("file.txt")));
    }

    #[test]
    fn test_include_restricts() {
        let matcher =
            PatternMatcher::with_patterns(&patterns(&["CLAUDE.md", "skills/**"]), &[]).unwrap();

        assert!(matcher.should_include(&PathBuf::from("CLAUDE.md")));
        assert!(matcher.should_include(&PathBuf::from("skills/review/SKILL.md")));
        assert!(!matcher.should_include(&PathBuf::from("history.jsonl")));
    }

    #[test]
    fn test_exclude_wins_over_include() {
        let matcher = PatternMatcher::with_patterns(
            &patterns(&["skills/**"]),
            &patterns(&["**/node_modules/**"]),
        )
        .unwrap();

        assert!(!matcher.should_include(&PathBuf::from("skills/x/node_modules/a.js")));
        assert!(matcher.should_include(&PathBuf::from("skills/x/index.js")));
    }

    #[test]
    fn test_directory_patterns() {
        let matcher =
            PatternMatcher::with_patterns(&[], &patterns(&["node_modules/"])).unwrap();

        assert!(matcher.is_excluded(&PathBuf::from("node_modules"), true));
        assert!(matcher.is_excluded(&PathBuf::from("node_modules/pkg/index.js"), false));
        assert!(!matcher.is_excluded(&PathBuf::from("src"), true));
    }

    #[test]
    fn test_root_gitignore() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".gitignore"), "*.log\ncache/\n").unwrap();

        let mut matcher = PatternMatcher::new();
        matcher.add_gitignore(tmp.path(), Path::new(""));

        assert!(!matcher.should_include(&PathBuf::from("debug.log")));
        assert!(!matcher.should_include(&PathBuf::from("cache/blob")));
        assert!(matcher.should_include(&PathBuf::from("CLAUDE.md")));
    }

    #[test]
    fn test_nested_gitignore_is_scoped_and_overrides_parent() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("skills/draft")).unwrap();
        fs::write(tmp.path().join(".gitignore"), "*.log\n").unwrap();
        fs::write(tmp.path().join("skills/.gitignore"), "!keep.log\nscratch.md\n").unwrap();

        let mut matcher = PatternMatcher::new();
        matcher.add_gitignore(tmp.path(), Path::new(""));
        matcher.add_gitignore(tmp.path(), Path::new("skills"));

        assert!(!matcher.should_include(&PathBuf::from("debug.log")));
        assert!(!matcher.should_include(&PathBuf::from("skills/other.log")));
        assert!(matcher.should_include(&PathBuf::from("skills/keep.log")));
        assert!(!matcher.should_include(&PathBuf::from("skills/draft/scratch.md")));
        assert!(matcher.should_include(&PathBuf::from("scratch.md")));
    }
}
