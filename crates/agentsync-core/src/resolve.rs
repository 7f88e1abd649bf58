//! Conflict resolution and destructive-source confirmation
//!
//! Each conflict moves `Pending → KeepSource | UseTarget | Skip` or
//! `Pending → AutoNewerWins`, after which the winning side's change is added
//! to the plan's copy or delete lists. Decisions come from a
//! [`DecisionSource`], so the same state machine serves the terminal
//! prompter, the automatic policy and scripted tests.

mod sources;

use std::cmp::Ordering;

pub use sources::{AutoPolicy, DeferAll, FnDecisions, ScriptedDecisions};

use crate::diff::{Conflict, Resolution, Side, SkipReason, Skipped, SyncMode, SyncPlan};
use crate::error::Result;
use crate::scanner::FileRecord;
use crate::state::DeletionDecision;

/// Decision for one conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Source side wins
    KeepSource,
    /// Target side wins
    UseTarget,
    /// Leave the path alone this run
    Skip,
    /// Newer modification time wins
    AutoNewerWins,
    /// No decision now; the conflict stays pending
    Defer,
}

/// A deletion from the source tree awaiting confirmation
#[derive(Debug, Clone, Copy)]
pub struct PendingDeletion<'a> {
    /// Relative path
    pub path: &'a str,
    /// Side the file would be deleted from
    pub side: Side,
    /// Record of the copy that would be deleted
    pub record: Option<&'a FileRecord>,
}

/// Supplies decisions for conflicts and destructive deletions
pub trait DecisionSource {
    /// Decide one conflict. `Err` aborts the tool's run.
    fn decide(&mut self, conflict: &Conflict) -> Result<Decision>;

    /// Confirm a deletion: `Confirmed` deletes, `Declined` keeps the copy,
    /// `Pending` defers to a later run.
    fn confirm_deletion(&mut self, deletion: &PendingDeletion<'_>) -> Result<DeletionDecision>;
}

/// Counts of what the resolver did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolutionSummary {
    /// Conflicts given a terminal resolution
    pub resolved: usize,
    /// Conflicts skipped
    pub skipped: usize,
    /// Conflicts left pending
    pub pending: usize,
    /// Source deletions declined or deferred
    pub deletions_withheld: usize,
}

/// Conflict resolver for one run
#[derive(Debug, Clone, Copy)]
pub struct ConflictResolver {
    mode: SyncMode,
    confirm_destructive_source: bool,
}

impl ConflictResolver {
    /// Resolver for a mode
    #[must_use]
    pub const fn new(mode: SyncMode, confirm_destructive_source: bool) -> Self {
        Self {
            mode,
            confirm_destructive_source,
        }
    }

    /// Drive every pending conflict, then confirm source deletions,
    /// including those a conflict resolution added.
    pub fn resolve(
        &self,
        plan: &mut SyncPlan,
        decisions: &mut dyn DecisionSource,
    ) -> Result<ResolutionSummary> {
        let mut summary = ResolutionSummary::default();

        for index in 0..plan.conflicts.len() {
            if plan.conflicts[index].resolution != Resolution::Pending {
                continue;
            }
            let decision = decisions.decide(&plan.conflicts[index])?;
            let resolution = match decision {
                Decision::KeepSource => Resolution::KeepSource,
                Decision::UseTarget => Resolution::UseTarget,
                Decision::Skip => Resolution::Skip,
                Decision::AutoNewerWins => Resolution::AutoNewerWins,
                Decision::Defer => {
                    summary.pending += 1;
                    continue;
                }
            };
            self.apply(plan, index, resolution);
            if resolution == Resolution::Skip {
                summary.skipped += 1;
            } else {
                summary.resolved += 1;
            }
        }

        if self.confirm_destructive_source {
            summary.deletions_withheld = Self::confirm_source_deletions(plan, decisions)?;
        }

        plan.normalize();
        tracing::debug!(?summary, "conflicts resolved");
        Ok(summary)
    }

    fn confirm_source_deletions(
        plan: &mut SyncPlan,
        decisions: &mut dyn DecisionSource,
    ) -> Result<usize> {
        let mut withheld = Vec::new();
        for path in &plan.delete_from_source {
            let deletion = PendingDeletion {
                path,
                side: Side::Source,
                record: plan.records.get(Side::Source, path),
            };
            let reason = match decisions.confirm_deletion(&deletion)? {
                DeletionDecision::Confirmed => continue,
                DeletionDecision::Declined => SkipReason::DeletionDeclined,
                DeletionDecision::Pending => SkipReason::DeletionDeferred,
            };
            withheld.push(Skipped {
                path: path.clone(),
                reason,
            });
        }

        plan.delete_from_source
            .retain(|path| !withheld.iter().any(|s| &s.path == path));
        let count = withheld.len();
        plan.skipped.extend(withheld);
        Ok(count)
    }

    fn apply(&self, plan: &mut SyncPlan, index: usize, resolution: Resolution) {
        let conflict = &mut plan.conflicts[index];
        conflict.resolution = resolution;
        let path = conflict.path.clone();

        let winner = match resolution {
            Resolution::KeepSource => Side::Source,
            Resolution::UseTarget => Side::Target,
            Resolution::AutoNewerWins => newer_side(conflict, self.mode),
            Resolution::Skip => {
                plan.skipped.push(Skipped {
                    path,
                    reason: SkipReason::ConflictSkipped,
                });
                return;
            }
            Resolution::Pending => return,
        };

        let loser = winner.other();
        let winner_present = conflict.record(winner).is_some();
        tracing::info!(path = %path, ?resolution, winner = %winner, "conflict resolved");
        if winner_present {
            plan.copies_into(loser).push(path);
        } else {
            plan.deletes_from(loser).push(path);
        }
    }
}

/// Side with the later modification time; the present side beats a deletion
/// and exact ties go to the mode's favored side.
#[must_use]
pub fn newer_side(conflict: &Conflict, mode: SyncMode) -> Side {
    match (&conflict.source, &conflict.target) {
        (Some(source), Some(target)) => match source.modified.cmp(&target.modified) {
            Ordering::Greater => Side::Source,
            Ordering::Less => Side::Target,
            Ordering::Equal => mode.favored_side(),
        },
        (Some(_), None) => Side::Source,
        (None, Some(_)) => Side::Target,
        (None, None) => mode.favored_side(),
    }
}
