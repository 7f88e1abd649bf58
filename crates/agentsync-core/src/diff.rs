//! Three-way classification of source, target and baseline
//!
//! For each path in the union of the three record sets, each side is
//! compared with the baseline and the pair of outcomes decides the action.
//! The result depends only on the record sets, never on traversal order.

mod plan;
mod rename;

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

pub use plan::{
    Conflict, ConflictKind, PlanRecords, Rename, Resolution, SkipReason, Skipped, SyncPlan,
};
pub use rename::{ExactDigest, LineSimilarity, RenameCandidate, SimilarityComparator};

use crate::scanner::{FileMap, FileRecord};
use crate::state::{DeletionDecision, Snapshot};

/// One of the two trees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// The source tree (e.g. a dotfiles checkout)
    Source,
    /// The target tree (e.g. the live tool directory)
    Target,
}

impl Side {
    /// The opposite side
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::Source => Self::Target,
            Self::Target => Self::Source,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Source => "source",
            Self::Target => "target",
        })
    }
}

/// Which propagation directions a run applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Source → target only
    Push,
    /// Target → source only
    Pull,
    /// Both directions
    Bidirectional,
}

impl SyncMode {
    /// Whether a change observed on `side` is propagated
    #[must_use]
    pub const fn propagates_from(self, side: Side) -> bool {
        matches!(
            (self, side),
            (Self::Bidirectional, _) | (Self::Push, Side::Source) | (Self::Pull, Side::Target)
        )
    }

    /// Side that wins exact modification-time ties
    #[must_use]
    pub const fn favored_side(self) -> Side {
        match self {
            Self::Pull => Side::Target,
            Self::Push | Self::Bidirectional => Side::Source,
        }
    }

    /// Lowercase name used in backup ids and reports
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Push => "push",
            Self::Pull => "pull",
            Self::Bidirectional => "bidirectional",
        }
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rename detection settings
pub struct DiffOptions<'a> {
    /// Collapse delete+create pairs into moves
    pub detect_renames: bool,
    /// Minimum similarity; `1.0` requires identical digests
    pub rename_threshold: f64,
    /// Similarity measure used below `1.0`
    pub comparator: &'a dyn SimilarityComparator,
}

impl Default for DiffOptions<'static> {
    fn default() -> Self {
        Self {
            detect_renames: true,
            rename_threshold: 1.0,
            comparator: &ExactDigest,
        }
    }
}

/// How one side relates to a baseline record
enum Change<'a> {
    Unchanged,
    Modified(&'a FileRecord),
    Deleted,
}

impl<'a> Change<'a> {
    fn of(current: Option<&'a FileRecord>, base: &FileRecord) -> Self {
        match current {
            None => Self::Deleted,
            Some(record) if record.digest == base.digest => Self::Unchanged,
            Some(record) => Self::Modified(record),
        }
    }
}

/// Classify every path and build the plan
#[must_use]
pub fn diff(
    source: &FileMap,
    target: &FileMap,
    baseline: &Snapshot,
    mode: SyncMode,
    options: &DiffOptions<'_>,
) -> SyncPlan {
    let paths: BTreeSet<&String> = source
        .keys()
        .chain(target.keys())
        .chain(baseline.files.keys())
        .collect();

    let mut plan = SyncPlan::new(
        mode,
        PlanRecords {
            source: source.clone(),
            target: target.clone(),
            baseline: baseline.files.clone(),
        },
    );

    for path in paths {
        let s = source.get(path);
        let t = target.get(path);
        match baseline.files.get(path) {
            None => classify_new(&mut plan, baseline, path, s, t),
            Some(base) => classify_known(&mut plan, path, s, t, base),
        }
    }

    if options.detect_renames {
        rename::detect(&mut plan, options);
    }
    plan.normalize();

    tracing::debug!(
        mode = %mode,
        actions = plan.action_count(),
        conflicts = plan.conflicts.len(),
        skipped = plan.skipped.len(),
        "plan computed"
    );
    plan
}

fn classify_new(
    plan: &mut SyncPlan,
    baseline: &Snapshot,
    path: &str,
    s: Option<&FileRecord>,
    t: Option<&FileRecord>,
) {
    match (s, t) {
        (Some(record), None) | (None, Some(record)) => {
            let side = if s.is_some() { Side::Source } else { Side::Target };
            let declined = baseline.deletions.get(path).is_some_and(|entry| {
                entry.decision == DeletionDecision::Declined && entry.digest == record.digest
            });
            if declined {
                tracing::debug!(path, "previously declined deletion, leaving alone");
                skip(plan, path, SkipReason::PreviouslyDeclined);
            } else {
                tracing::debug!(path, side = %side, "added");
                propagate(plan, path, side);
            }
        }
        (Some(a), Some(b)) if a.digest == b.digest => plan.in_sync.push(path.to_string()),
        (Some(a), Some(b)) => conflict(plan, path, ConflictKind::BothAdded, Some(a), Some(b), None),
        (None, None) => {}
    }
}

fn classify_known(
    plan: &mut SyncPlan,
    path: &str,
    s: Option<&FileRecord>,
    t: Option<&FileRecord>,
    base: &FileRecord,
) {
    match (Change::of(s, base), Change::of(t, base)) {
        (Change::Unchanged, Change::Unchanged) => plan.in_sync.push(path.to_string()),
        (Change::Modified(_), Change::Unchanged) => propagate(plan, path, Side::Source),
        (Change::Unchanged, Change::Modified(_)) => propagate(plan, path, Side::Target),
        (Change::Modified(a), Change::Modified(b)) if a.digest == b.digest => {
            tracing::debug!(path, "converged");
            plan.in_sync.push(path.to_string());
        }
        (Change::Modified(a), Change::Modified(b)) => {
            conflict(plan, path, ConflictKind::BothModified, Some(a), Some(b), Some(base));
        }
        (Change::Deleted, Change::Unchanged) => delete(plan, path, Side::Source),
        (Change::Unchanged, Change::Deleted) => delete(plan, path, Side::Target),
        (Change::Deleted, Change::Deleted) => plan.both_deleted.push(path.to_string()),
        (Change::Deleted, Change::Modified(b)) => {
            conflict(plan, path, ConflictKind::DeletedInSource, None, Some(b), Some(base));
        }
        (Change::Modified(a), Change::Deleted) => {
            conflict(plan, path, ConflictKind::DeletedInTarget, Some(a), None, Some(base));
        }
    }
}

fn skip(plan: &mut SyncPlan, path: &str, reason: SkipReason) {
    plan.skipped.push(Skipped {
        path: path.to_string(),
        reason,
    });
}

fn propagate(plan: &mut SyncPlan, path: &str, changed_on: Side) {
    if plan.mode.propagates_from(changed_on) {
        plan.copies_into(changed_on.other()).push(path.to_string());
    } else {
        skip(plan, path, SkipReason::Direction { changed_on });
    }
}

fn delete(plan: &mut SyncPlan, path: &str, deleted_on: Side) {
    tracing::debug!(path, side = %deleted_on, "deleted");
    if plan.mode.propagates_from(deleted_on) {
        plan.deletes_from(deleted_on.other()).push(path.to_string());
    } else {
        skip(plan, path, SkipReason::DeletionNotPropagated { deleted_on });
    }
}

fn conflict(
    plan: &mut SyncPlan,
    path: &str,
    kind: ConflictKind,
    source: Option<&FileRecord>,
    target: Option<&FileRecord>,
    baseline: Option<&FileRecord>,
) {
    tracing::debug!(path, %kind, "conflict");
    plan.conflicts.push(Conflict {
        path: path.to_string(),
        kind,
        source: source.cloned(),
        target: target.cloned(),
        baseline: baseline.cloned(),
        resolution: Resolution::Pending,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MachineId;
    use crate::scanner::ContentDigest;
    use chrono::Utc;

    fn rec(content: &str) -> FileRecord {
        FileRecord {
            digest: ContentDigest::of_bytes(content.as_bytes()),
            size: content.len() as u64,
            modified: Utc::now(),
        }
    }

    fn files(entries: &[(&str, &str)]) -> FileMap {
        entries
            .iter()
            .map(|(path, content)| ((*path).to_string(), rec(content)))
            .collect()
    }

    fn baseline(entries: &[(&str, &str)]) -> Snapshot {
        let mut snapshot = Snapshot::empty(MachineId::new("test-00000000"));
        snapshot.files = files(entries);
        snapshot
    }

    fn run(source: &FileMap, target: &FileMap, base: &Snapshot, mode: SyncMode) -> SyncPlan {
        diff(source, target, base, mode, &DiffOptions::default())
    }

    #[test]
    fn test_push_new_file() {
        let plan = run(
            &files(&[("skills/new.md", "new")]),
            &FileMap::new(),
            &baseline(&[]),
            SyncMode::Push,
        );

        assert_eq!(plan.copy_to_target, vec!["skills/new.md"]);
        assert!(plan.conflicts.is_empty());
        assert_eq!(plan.action_count(), 1);
    }

    #[test]
    fn test_divergent_edit_is_conflict() {
        let plan = run(
            &files(&[("CLAUDE.md", "h1")]),
            &files(&[("CLAUDE.md", "h2")]),
            &baseline(&[("CLAUDE.md", "h0")]),
            SyncMode::Bidirectional,
        );

        assert_eq!(plan.conflicts.len(), 1);
        let conflict = &plan.conflicts[0];
        assert_eq!(conflict.kind, ConflictKind::BothModified);
        assert_eq!(conflict.source.as_ref().unwrap().digest, rec("h1").digest);
        assert_eq!(conflict.target.as_ref().unwrap().digest, rec("h2").digest);
        assert_eq!(conflict.resolution, Resolution::Pending);
        assert_eq!(plan.action_count(), 0);
    }

    #[test]
    fn test_pull_deletion_propagation() {
        let plan = run(
            &files(&[("settings.json", "s")]),
            &FileMap::new(),
            &baseline(&[("settings.json", "s")]),
            SyncMode::Pull,
        );

        assert_eq!(plan.delete_from_source, vec!["settings.json"]);
    }

    #[test]
    fn test_unchanged_and_converged_paths_have_no_action() {
        let plan = run(
            &files(&[("a.md", "a"), ("b.md", "new")]),
            &files(&[("a.md", "a"), ("b.md", "new")]),
            &baseline(&[("a.md", "a"), ("b.md", "old")]),
            SyncMode::Bidirectional,
        );

        assert!(plan.is_empty());
        assert_eq!(plan.in_sync, vec!["a.md", "b.md"]);
    }

    #[test]
    fn test_mode_gates_direction() {
        let source = files(&[("a.md", "a")]);
        let target = files(&[("a.md", "a"), ("t.md", "target only")]);
        let base = baseline(&[("a.md", "a")]);

        let push = run(&source, &target, &base, SyncMode::Push);
        assert!(push.copy_to_source.is_empty());
        assert_eq!(
            push.skipped,
            vec![Skipped {
                path: "t.md".to_string(),
                reason: SkipReason::Direction {
                    changed_on: Side::Target
                },
            }]
        );

        let bidi = run(&source, &target, &base, SyncMode::Bidirectional);
        assert_eq!(bidi.copy_to_source, vec!["t.md"]);
    }

    #[test]
    fn test_deleted_both_sides() {
        let plan = run(
            &FileMap::new(),
            &FileMap::new(),
            &baseline(&[("gone.md", "x")]),
            SyncMode::Bidirectional,
        );

        assert!(plan.is_empty());
        assert_eq!(plan.both_deleted, vec!["gone.md"]);
    }

    #[test]
    fn test_delete_versus_modify_conflicts() {
        let plan = run(
            &FileMap::new(),
            &files(&[("a.md", "edited")]),
            &baseline(&[("a.md", "orig")]),
            SyncMode::Push,
        );

        assert_eq!(plan.conflicts.len(), 1);
        assert_eq!(plan.conflicts[0].kind, ConflictKind::DeletedInSource);
        assert!(plan.conflicts[0].source.is_none());
    }

    #[test]
    fn test_both_added_different_content() {
        let plan = run(
            &files(&[("x.md", "one")]),
            &files(&[("x.md", "two")]),
            &baseline(&[]),
            SyncMode::Push,
        );

        assert_eq!(plan.conflicts[0].kind, ConflictKind::BothAdded);
        assert!(plan.conflicts[0].baseline.is_none());
    }

    #[test]
    fn test_declined_deletion_not_resurrected() {
        let mut base = baseline(&[]);
        base.record_deletion(
            "kept.md",
            rec("kept").digest,
            DeletionDecision::Declined,
            Utc::now(),
        );

        let plan = run(
            &FileMap::new(),
            &files(&[("kept.md", "kept")]),
            &base,
            SyncMode::Bidirectional,
        );
        assert!(plan.is_empty());
        assert_eq!(plan.skipped[0].reason, SkipReason::PreviouslyDeclined);

        let edited = run(
            &FileMap::new(),
            &files(&[("kept.md", "kept, then edited")]),
            &base,
            SyncMode::Bidirectional,
        );
        assert_eq!(edited.copy_to_source, vec!["kept.md"]);
    }

    #[test]
    fn test_classification_is_order_independent() {
        let source = files(&[("b.md", "1"), ("a.md", "2"), ("c/d.md", "3")]);
        let target = files(&[("c/d.md", "4"), ("a.md", "2")]);
        let base = baseline(&[("c/d.md", "0")]);

        let first = run(&source, &target, &base, SyncMode::Bidirectional);
        let second = run(&source, &target, &base, SyncMode::Bidirectional);

        assert_eq!(first, second);
        assert_eq!(first.copy_to_target, vec!["b.md"]);
        assert_eq!(first.in_sync, vec!["a.md"]);
        assert_eq!(first.conflicts.len(), 1);
    }

    #[test]
    fn test_favored_side() {
        assert_eq!(SyncMode::Push.favored_side(), Side::Source);
        assert_eq!(SyncMode::Pull.favored_side(), Side::Target);
        assert_eq!(SyncMode::Bidirectional.favored_side(), Side::Source);
    }
}
