//! Sync plan produced by the diff engine

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Side, SyncMode};
use crate::scanner::{FileMap, FileRecord};

/// How a conflict arose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// Both sides changed a baseline file differently
    BothModified,
    /// Both sides created the path with different content
    BothAdded,
    /// Source deleted a file the target modified
    DeletedInSource,
    /// Target deleted a file the source modified
    DeletedInTarget,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::BothModified => "modified on both sides",
            Self::BothAdded => "added on both sides",
            Self::DeletedInSource => "deleted in source, modified in target",
            Self::DeletedInTarget => "modified in source, deleted in target",
        })
    }
}

/// Conflict state machine position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// No decision yet; blocks only this path
    Pending,
    /// Source side wins
    KeepSource,
    /// Target side wins
    UseTarget,
    /// Leave both sides and the baseline untouched
    Skip,
    /// Newer modification time wins
    AutoNewerWins,
}

/// A path changed differently on both sides
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    /// Relative path
    pub path: String,
    /// How the conflict arose
    pub kind: ConflictKind,
    /// Current source record, absent when deleted
    pub source: Option<FileRecord>,
    /// Current target record, absent when deleted
    pub target: Option<FileRecord>,
    /// Baseline record, absent when both sides added the path
    pub baseline: Option<FileRecord>,
    /// Decision state
    pub resolution: Resolution,
}

impl Conflict {
    /// Record on one side
    #[must_use]
    pub const fn record(&self, side: Side) -> Option<&FileRecord> {
        match side {
            Side::Source => self.source.as_ref(),
            Side::Target => self.target.as_ref(),
        }
    }
}

/// Why a path is not acted on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// A change on `changed_on` that the mode does not propagate
    Direction {
        /// Side carrying the change
        changed_on: Side,
    },
    /// A deletion on `deleted_on` that the mode does not propagate
    DeletionNotPropagated {
        /// Side where the file disappeared
        deleted_on: Side,
    },
    /// Operator chose to skip the conflict
    ConflictSkipped,
    /// Operator declined to delete the surviving copy
    DeletionDeclined,
    /// Deletion waits for confirmation on a later run
    DeletionDeferred,
    /// Surviving copy of a previously declined deletion, unchanged since
    PreviouslyDeclined,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direction { changed_on } => {
                write!(f, "changed in {changed_on}, not propagated in this mode")
            }
            Self::DeletionNotPropagated { deleted_on } => {
                write!(f, "deleted in {deleted_on}, not propagated in this mode")
            }
            Self::ConflictSkipped => f.write_str("conflict skipped"),
            Self::DeletionDeclined => f.write_str("deletion declined"),
            Self::DeletionDeferred => f.write_str("deletion awaiting confirmation"),
            Self::PreviouslyDeclined => f.write_str("deletion previously declined"),
        }
    }
}

/// Path excluded from execution, with the reason
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    /// Relative path
    pub path: String,
    /// Why
    pub reason: SkipReason,
}

/// One delete+create pair collapsed into a move
#[derive(Debug, Clone, PartialEq)]
pub struct Rename {
    /// Path that disappeared on `renamed_on`
    pub from: String,
    /// Path that appeared on `renamed_on`
    pub to: String,
    /// Side where the rename happened; the move is applied to the other side
    pub renamed_on: Side,
    /// Similarity score that paired the two paths
    pub similarity: f64,
}

impl Rename {
    /// Side the move is applied to
    #[must_use]
    pub const fn apply_on(&self) -> Side {
        self.renamed_on.other()
    }
}

/// Inputs the plan was computed from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanRecords {
    /// Source scan
    pub source: FileMap,
    /// Target scan
    pub target: FileMap,
    /// Baseline files
    pub baseline: FileMap,
}

impl PlanRecords {
    /// Record for a path on a side
    #[must_use]
    pub fn get(&self, side: Side, path: &str) -> Option<&FileRecord> {
        match side {
            Side::Source => self.source.get(path),
            Side::Target => self.target.get(path),
        }
    }
}

/// Classified actions for one tool run.
///
/// Every list is kept sorted so the plan depends only on its inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncPlan {
    /// Mode the plan was computed for
    pub mode: SyncMode,
    /// Source → target copies
    pub copy_to_target: Vec<String>,
    /// Target → source copies
    pub copy_to_source: Vec<String>,
    /// Deletions applied to the target
    pub delete_from_target: Vec<String>,
    /// Deletions applied to the source
    pub delete_from_source: Vec<String>,
    /// Moves applied to the side that did not see the rename
    pub renames: Vec<Rename>,
    /// Conflicts and their resolution state
    pub conflicts: Vec<Conflict>,
    /// Paths deliberately left alone
    pub skipped: Vec<Skipped>,
    /// Paths equal on both sides (unchanged or converged)
    pub in_sync: Vec<String>,
    /// Paths deleted on both sides
    pub both_deleted: Vec<String>,
    /// Records the plan was computed from
    pub records: PlanRecords,
}

impl SyncPlan {
    /// Empty plan for a mode
    #[must_use]
    pub fn new(mode: SyncMode, records: PlanRecords) -> Self {
        Self {
            mode,
            copy_to_target: Vec::new(),
            copy_to_source: Vec::new(),
            delete_from_target: Vec::new(),
            delete_from_source: Vec::new(),
            renames: Vec::new(),
            conflicts: Vec::new(),
            skipped: Vec::new(),
            in_sync: Vec::new(),
            both_deleted: Vec::new(),
            records,
        }
    }

    /// Copy list into `dest`
    pub fn copies_into(&mut self, dest: Side) -> &mut Vec<String> {
        match dest {
            Side::Source => &mut self.copy_to_source,
            Side::Target => &mut self.copy_to_target,
        }
    }

    /// Delete list for `side`
    pub fn deletes_from(&mut self, side: Side) -> &mut Vec<String> {
        match side {
            Side::Source => &mut self.delete_from_source,
            Side::Target => &mut self.delete_from_target,
        }
    }

    /// Number of copy, delete and rename actions
    #[must_use]
    pub fn action_count(&self) -> usize {
        self.copy_to_target.len()
            + self.copy_to_source.len()
            + self.delete_from_target.len()
            + self.delete_from_source.len()
            + self.renames.len()
    }

    /// No actions and no conflicts
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.action_count() == 0 && self.conflicts.is_empty()
    }

    /// Conflicts still waiting for a decision
    pub fn pending_conflicts(&self) -> impl Iterator<Item = &Conflict> {
        self.conflicts
            .iter()
            .filter(|c| c.resolution == Resolution::Pending)
    }

    /// Sort every list; called after the plan is edited
    pub fn normalize(&mut self) {
        for list in [
            &mut self.copy_to_target,
            &mut self.copy_to_source,
            &mut self.delete_from_target,
            &mut self.delete_from_source,
            &mut self.in_sync,
            &mut self.both_deleted,
        ] {
            list.sort();
            list.dedup();
        }
        self.renames.sort_by(|a, b| a.to.cmp(&b.to));
        self.conflicts.sort_by(|a, b| a.path.cmp(&b.path));
        self.skipped.sort_by(|a, b| a.path.cmp(&b.path));
    }
}
