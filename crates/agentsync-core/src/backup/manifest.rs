//! Backup identifiers and manifests

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::MachineId;
use crate::config::is_simple_name;
use crate::diff::SyncMode;
use crate::error::{Error, Result};
use crate::scanner::ContentDigest;

/// Manifest file name inside a backup directory
pub const MANIFEST_FILE: &str = "manifest.json";

/// Backup identifier `<YYYYmmdd-HHMMSS-mmm>-<mode>-<tool>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackupId(String);

impl BackupId {
    pub(crate) fn generate(at: DateTime<Utc>, mode: SyncMode, tool: &str) -> Self {
        Self(format!("{}-{mode}-{tool}", at.format("%Y%m%d-%H%M%S-%3f")))
    }

    pub(crate) fn with_suffix(&self, n: u32) -> Self {
        Self(format!("{}-{n}", self.0))
    }

    /// Parse an operator-supplied identifier
    pub fn parse(raw: &str) -> Result<Self> {
        if is_simple_name(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(Error::BackupNotFound(raw.to_string()))
        }
    }

    /// Identifier as a string
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BackupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who created a backup and why
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupContext {
    /// Tool name
    pub tool: String,
    /// Machine running the sync
    pub machine_id: MachineId,
    /// Sync mode of the run
    pub operation: SyncMode,
}

/// One backed-up file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupEntry {
    /// Absolute path the file was copied from
    pub original_path: PathBuf,
    /// Whole-file digest of the pre-image
    pub digest: ContentDigest,
    /// Copy location, relative to the backup directory
    pub stored_copy_path: PathBuf,
}

/// Durable record of one backup operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupManifest {
    /// Identifier (also the directory name)
    pub backup_id: BackupId,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Tool the backup belongs to
    pub tool: String,
    /// Machine that created it
    pub machine_id: MachineId,
    /// Sync mode of the run that created it
    pub operation: SyncMode,
    /// Backed-up files
    pub entries: Vec<BackupEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_id_format() {
        let at = Utc.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).unwrap();
        let id = BackupId::generate(at, SyncMode::Push, "claude");
        assert_eq!(id.as_str(), "20250304-050607-000-push-claude");
        assert_eq!(id.with_suffix(2).as_str(), "20250304-050607-000-push-claude-2");
    }

    #[test]
    fn test_parse_rejects_paths() {
        assert!(BackupId::parse("20250304-050607-000-push-claude").is_ok());
        assert!(BackupId::parse("../../etc").is_err());
        assert!(BackupId::parse("a/b").is_err());
    }
}
