//! Directory scanning into path → content-state mappings
//!
//! This module provides:
//! - Recursive walking under include/exclude rules (gitignore semantics)
//! - Streaming SHA-256 content digests
//! - `extract_keys` digests for structured files
//! - Partial-failure tolerance: unreadable files become warnings

mod hash;
mod special;

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

pub use hash::{ContentDigest, FileHasher};
pub use special::{SpecialRules, canonicalize, extract, extracted_digest, merge, parse_document};

use crate::config::{PatternMatcher, ResolvedTool, STATE_DIR_NAME};
use crate::error::{Error, Result};
use crate::fsutil::TEMP_PREFIX;

/// Content state of one file at scan time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Content digest (extracted-key digest for specially handled files)
    pub digest: ContentDigest,
    /// Size in bytes
    pub size: u64,
    /// Last modification time
    #[serde(rename = "mtime")]
    pub modified: DateTime<Utc>,
}

/// Records keyed by `/`-separated path relative to a tree root
pub type FileMap = BTreeMap<String, FileRecord>;

/// Result of scanning one tree
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    /// Files that were read successfully
    pub files: FileMap,
    /// Non-fatal warnings encountered during scanning
    pub warnings: Vec<String>,
}

/// Scanner options that do not come from patterns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    /// Follow symlinks instead of skipping them
    pub follow_symlinks: bool,
    /// Honour `.gitignore` files anywhere in the tree
    pub respect_gitignore: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            follow_symlinks: false,
            respect_gitignore: true,
        }
    }
}

/// Main scanner
#[derive(Debug, Clone)]
pub struct Scanner {
    include: Vec<String>,
    exclude: Vec<String>,
    special: SpecialRules,
    options: ScanOptions,
}

impl Scanner {
    /// Create a scanner from patterns and special handling rules
    #[must_use]
    pub const fn new(
        include: Vec<String>,
        exclude: Vec<String>,
        special: SpecialRules,
        options: ScanOptions,
    ) -> Self {
        Self {
            include,
            exclude,
            special,
            options,
        }
    }

    /// Scanner for a resolved tool
    #[must_use]
    pub fn for_tool(tool: &ResolvedTool, options: ScanOptions) -> Self {
        Self::new(
            tool.include.clone(),
            tool.exclude.clone(),
            tool.special.clone(),
            options,
        )
    }

    /// Scan a tree root.
    ///
    /// Fails with [`Error::Scan`] if the root itself cannot be read.
    pub fn scan(&self, root: &Path) -> Result<ScanResult> {
        std::fs::read_dir(root).map_err(|source| Error::Scan {
            root: root.to_path_buf(),
            source,
        })?;

        let mut matcher = PatternMatcher::with_patterns(&self.include, &self.exclude)?;
        let respect_gitignore = self.options.respect_gitignore;

        let mut result = ScanResult::default();
        let walker = WalkDir::new(root)
            .follow_links(self.options.follow_symlinks)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| {
                let Ok(rel) = entry.path().strip_prefix(root) else {
                    return false;
                };
                let is_root = entry.depth() == 0;
                if !is_root && is_internal(entry.file_name()) {
                    return false;
                }
                if is_root || entry.file_type().is_dir() {
                    if !is_root && matcher.is_excluded(rel, true) {
                        return false;
                    }
                    // parents are visited before their children
                    if respect_gitignore {
                        matcher.add_gitignore(root, rel);
                    }
                    return true;
                }
                matcher.should_include(rel)
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    result.warn(format!("Skipping unreadable entry: {e}"));
                    continue;
                }
            };

            if entry.file_type().is_symlink() {
                tracing::debug!(path = %entry.path().display(), "skipping symlink");
                continue;
            }
            if !entry.file_type().is_file() {
                continue;
            }

            let Ok(rel) = entry.path().strip_prefix(root) else {
                continue;
            };
            let Some(key) = relative_key(rel) else {
                result.warn(format!("Skipping non UTF-8 path: {}", entry.path().display()));
                continue;
            };

            match self.record(&key, entry.path()) {
                Ok((record, warning)) => {
                    if let Some(warning) = warning {
                        result.warn(warning);
                    }
                    tracing::trace!(path = %key, digest = %record.digest.short(), "scanned");
                    result.files.insert(key, record);
                }
                Err(e) => result.warn(format!("Skipping {key}: {e}")),
            }
        }

        tracing::debug!(
            root = %root.display(),
            files = result.files.len(),
            warnings = result.warnings.len(),
            "scan complete"
        );
        Ok(result)
    }

    fn record(&self, key: &str, path: &Path) -> Result<(FileRecord, Option<String>)> {
        let metadata = std::fs::metadata(path).map_err(|e| Error::io(path, e))?;
        let modified = metadata.modified().map_err(|e| Error::io(path, e))?;
        let (digest, warning) = digest_for(&self.special, key, path)?;
        Ok((
            FileRecord {
                digest,
                size: metadata.len(),
                modified: DateTime::<Utc>::from(modified),
            },
            warning,
        ))
    }
}

impl ScanResult {
    fn warn(&mut self, warning: String) {
        tracing::warn!("{warning}");
        self.warnings.push(warning);
    }
}

/// Digest a file the way the scanner does, honouring special handling.
///
/// A specially handled file that fails to parse falls back to a whole-file
/// digest; the returned warning says so.
pub fn digest_for(
    special: &SpecialRules,
    key: &str,
    path: &Path,
) -> Result<(ContentDigest, Option<String>)> {
    let Some(rule) = special.lookup(key) else {
        return Ok((FileHasher::hash(path)?, None));
    };
    match extracted_digest(path, rule) {
        Ok(digest) => Ok((digest, None)),
        Err(Error::SpecialHandling { reason, .. }) => Ok((
            FileHasher::hash(path)?,
            Some(format!(
                "{key}: cannot extract keys ({reason}); comparing whole file"
            )),
        )),
        Err(e) => Err(e),
    }
}

fn is_internal(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|name| {
        name == STATE_DIR_NAME || (name.starts_with(TEMP_PREFIX) && name.ends_with(".tmp"))
    })
}

/// `/`-joined relative path, or `None` for non UTF-8 components
fn relative_key(rel: &Path) -> Option<String> {
    let parts: Option<Vec<&str>> = rel
        .components()
        .map(|c| match c {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect();
    parts.map(|parts| parts.join("/"))
}

/// Absolute path of a relative key under `root`
#[must_use]
pub fn absolute(root: &Path, key: &str) -> PathBuf {
    key.split('/').fold(root.to_path_buf(), |path, part| path.join(part))
}
