//! Baseline snapshot and deletion ledger types

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::MachineId;
use crate::scanner::{ContentDigest, FileMap, FileRecord};

/// State file schema version understood by this build
pub const SCHEMA_VERSION: u32 = 1;

/// Outcome of a deletion seen on one side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeletionDecision {
    /// Deleted on both sides
    Confirmed,
    /// Operator kept the surviving copy
    Declined,
    /// Seen but not propagated yet
    Pending,
}

/// Ledger entry for a path removed from the baseline files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionRecord {
    /// When the deletion was recorded
    pub deleted_at: DateTime<Utc>,
    /// Digest of the content the decision applies to
    pub digest: ContentDigest,
    /// Decision taken
    pub decision: DeletionDecision,
}

/// Baseline for one (tool, machine) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Schema version
    pub version: u32,
    /// Machine this baseline belongs to
    pub machine_id: MachineId,
    /// First successful sync
    pub created_at: DateTime<Utc>,
    /// Most recent successful sync
    pub last_sync: DateTime<Utc>,
    /// Agreed content per path
    #[serde(default)]
    pub files: FileMap,
    /// Deletion ledger
    #[serde(default)]
    pub deletions: BTreeMap<String, DeletionRecord>,
}

impl Snapshot {
    /// Empty baseline for a machine that has never synced this tool
    #[must_use]
    pub fn empty(machine_id: MachineId) -> Self {
        let now = Utc::now();
        Self {
            version: SCHEMA_VERSION,
            machine_id,
            created_at: now,
            last_sync: now,
            files: FileMap::new(),
            deletions: BTreeMap::new(),
        }
    }

    /// Whether nothing has been recorded yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.deletions.is_empty()
    }

    /// Record agreed content for a path, clearing any ledger entry
    pub fn agree(&mut self, path: &str, record: FileRecord) {
        self.deletions.remove(path);
        self.files.insert(path.to_string(), record);
    }

    /// Drop a path from the files and record a ledger entry for it
    pub fn record_deletion(
        &mut self,
        path: &str,
        digest: ContentDigest,
        decision: DeletionDecision,
        at: DateTime<Utc>,
    ) {
        self.files.remove(path);
        self.deletions.insert(
            path.to_string(),
            DeletionRecord {
                deleted_at: at,
                digest,
                decision,
            },
        );
    }

    /// Keep the path's files entry but mark its deletion as pending
    pub fn defer_deletion(&mut self, path: &str, digest: ContentDigest, at: DateTime<Utc>) {
        self.deletions.insert(
            path.to_string(),
            DeletionRecord {
                deleted_at: at,
                digest,
                decision: DeletionDecision::Pending,
            },
        );
    }

    /// Paths whose deletion is waiting for a direction or a confirmation
    pub fn pending_deletions(&self) -> impl Iterator<Item = &str> {
        self.deletions
            .iter()
            .filter(|(_, record)| record.decision == DeletionDecision::Pending)
            .map(|(path, _)| path.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(content: &[u8]) -> FileRecord {
        FileRecord {
            digest: ContentDigest::of_bytes(content),
            size: content.len() as u64,
            modified: Utc::now(),
        }
    }

    #[test]
    fn test_agree_clears_ledger() {
        let mut snapshot = Snapshot::empty(MachineId::new("host-1"));
        snapshot.record_deletion(
            "a.md",
            ContentDigest::of_bytes(b"a"),
            DeletionDecision::Declined,
            Utc::now(),
        );
        assert!(snapshot.deletions.contains_key("a.md"));

        snapshot.agree("a.md", record(b"a"));

        assert!(snapshot.files.contains_key("a.md"));
        assert!(snapshot.deletions.is_empty());
    }

    #[test]
    fn test_state_file_shape() {
        let mut snapshot = Snapshot::empty(MachineId::new("host-1"));
        snapshot.agree("CLAUDE.md", record(b"memory"));
        snapshot.defer_deletion("old.md", ContentDigest::of_bytes(b"old"), Utc::now());

        let value = serde_json::to_value(&snapshot).unwrap();

        assert_eq!(value["version"], 1);
        assert_eq!(value["machine_id"], "host-1");
        assert!(value["files"]["CLAUDE.md"]["digest"].is_string());
        assert!(value["files"]["CLAUDE.md"]["mtime"].is_string());
        assert_eq!(value["deletions"]["old.md"]["decision"], "pending");
        assert_eq!(snapshot.pending_deletions().collect::<Vec<_>>(), vec!["old.md"]);
    }
}
