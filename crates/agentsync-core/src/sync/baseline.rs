//! Computing the baseline that supersedes the previous one after a run

use chrono::{DateTime, Utc};

use super::actions::SyncAction;
use super::executor::ExecutionReport;
use crate::diff::{Side, SkipReason, SyncPlan};
use crate::scanner::{ContentDigest, FileRecord};
use crate::state::{DeletionDecision, Snapshot};

/// New baseline after executing `plan`.
///
/// Only paths the run settled move forward: applied actions, agreed paths
/// and recorded deletion decisions. Failed actions, skipped or pending
/// conflicts and direction-skipped changes keep their previous entry, so
/// they are offered again next run.
#[must_use]
pub fn advance(
    previous: &Snapshot,
    plan: &SyncPlan,
    report: &ExecutionReport,
    now: DateTime<Utc>,
) -> Snapshot {
    let mut next = previous.clone();
    next.last_sync = now;
    let records = &plan.records;

    for path in &plan.in_sync {
        if let Some(record) = current(plan, path) {
            next.agree(path, record.clone());
        }
    }

    for path in &plan.both_deleted {
        if let Some(base) = records.baseline.get(path) {
            next.record_deletion(path, base.digest.clone(), DeletionDecision::Confirmed, now);
        }
    }

    for action in report.applied() {
        match action {
            SyncAction::Create { path, to } | SyncAction::Update { path, to } => {
                if let Some(record) = records.get(to.other(), path) {
                    next.agree(path, record.clone());
                }
            }
            SyncAction::Delete { path, side } => {
                if let Some(digest) = removed_digest(plan, *side, path) {
                    next.record_deletion(path, digest, DeletionDecision::Confirmed, now);
                }
            }
            SyncAction::Rename { from, to, side } => {
                if let Some(digest) = removed_digest(plan, *side, from) {
                    next.record_deletion(from, digest, DeletionDecision::Confirmed, now);
                }
                if let Some(record) = records.get(side.other(), to) {
                    next.agree(to, record.clone());
                }
            }
        }
    }

    for skipped in &plan.skipped {
        let path = skipped.path.as_str();
        match skipped.reason {
            SkipReason::DeletionNotPropagated { .. } | SkipReason::DeletionDeferred => {
                if let Some(base) = records.baseline.get(path) {
                    next.defer_deletion(path, base.digest.clone(), now);
                }
            }
            SkipReason::DeletionDeclined => {
                // The deletion would have hit the source, so the source copy survives
                if let Some(survivor) = records.get(Side::Source, path) {
                    next.record_deletion(
                        path,
                        survivor.digest.clone(),
                        DeletionDecision::Declined,
                        now,
                    );
                }
            }
            SkipReason::Direction { .. }
            | SkipReason::ConflictSkipped
            | SkipReason::PreviouslyDeclined => {}
        }
    }

    next
}

fn current<'p>(plan: &'p SyncPlan, path: &str) -> Option<&'p FileRecord> {
    plan.records
        .get(Side::Source, path)
        .or_else(|| plan.records.get(Side::Target, path))
}

fn removed_digest(plan: &SyncPlan, side: Side, path: &str) -> Option<ContentDigest> {
    plan.records
        .get(side, path)
        .or_else(|| plan.records.baseline.get(path))
        .map(|record| record.digest.clone())
}
