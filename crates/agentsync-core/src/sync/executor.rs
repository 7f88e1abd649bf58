//! Plan execution with pre-image backups and post-write verification

use std::fs;
use std::path::{Path, PathBuf};

use super::actions::{SyncAction, SyncActionResolver};
use crate::backup::{BackupContext, BackupId, BackupManager, BackupSession};
use crate::config::ResolvedTool;
use crate::diff::{Side, SyncPlan};
use crate::error::{Error, Result};
use crate::fsutil;
use crate::scanner::{self, ContentDigest, SpecialRules};

/// Outcome of one action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionStatus {
    /// Performed (and verified when verification is on)
    Applied,
    /// Dry run: would be performed
    Planned,
    /// Attempted and failed
    Failed(String),
    /// Not attempted because its pre-image could not be backed up
    BackupFailed(String),
}

/// Action with its outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    /// The action
    pub action: SyncAction,
    /// What happened
    pub status: ActionStatus,
}

/// Per-run execution report
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionReport {
    /// Whether the disk was left untouched
    pub dry_run: bool,
    /// One outcome per action, in execution order
    pub outcomes: Vec<ActionOutcome>,
    /// Paths blocked by conflicts without a resolution
    pub unresolved: Vec<String>,
    /// Backup holding the pre-images of this run
    pub backup_id: Option<BackupId>,
}

impl ExecutionReport {
    /// Actions in order, regardless of outcome
    pub fn actions(&self) -> impl Iterator<Item = &SyncAction> {
        self.outcomes.iter().map(|o| &o.action)
    }

    /// Actions that were performed
    pub fn applied(&self) -> impl Iterator<Item = &SyncAction> {
        self.outcomes
            .iter()
            .filter(|o| o.status == ActionStatus::Applied)
            .map(|o| &o.action)
    }

    /// Outcomes that failed, including backup failures
    pub fn failed(&self) -> impl Iterator<Item = &ActionOutcome> {
        self.outcomes.iter().filter(|o| {
            matches!(o.status, ActionStatus::Failed(_) | ActionStatus::BackupFailed(_))
        })
    }

    /// No failures and no unresolved conflicts
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed().next().is_none() && self.unresolved.is_empty()
    }
}

/// Executes a resolved plan against the two trees
pub struct PlanExecutor<'a> {
    source_root: &'a Path,
    target_root: &'a Path,
    special: &'a SpecialRules,
    backups: &'a BackupManager,
    context: BackupContext,
    verify: bool,
}

impl<'a> PlanExecutor<'a> {
    /// Executor for a tool's trees
    #[must_use]
    pub fn new(
        tool: &'a ResolvedTool,
        backups: &'a BackupManager,
        context: BackupContext,
        verify: bool,
    ) -> Self {
        Self {
            source_root: tool.source.as_path(),
            target_root: tool.target.as_path(),
            special: &tool.special,
            backups,
            context,
            verify,
        }
    }

    fn root(&self, side: Side) -> &'a Path {
        match side {
            Side::Source => self.source_root,
            Side::Target => self.target_root,
        }
    }

    fn path(&self, side: Side, key: &str) -> PathBuf {
        scanner::absolute(self.root(side), key)
    }

    /// Apply the plan, or report what would be applied when `dry_run`.
    ///
    /// Failures are recorded per action; execution always continues.
    #[must_use]
    pub fn execute(&self, plan: &SyncPlan, dry_run: bool) -> ExecutionReport {
        let actions = SyncActionResolver::resolve(plan);
        let unresolved: Vec<String> = plan.pending_conflicts().map(|c| c.path.clone()).collect();
        for path in &unresolved {
            tracing::warn!("{}", Error::ConflictUnresolved { path: path.clone() });
        }

        if dry_run {
            let outcomes = actions
                .into_iter()
                .map(|action| {
                    tracing::info!("[DRY RUN] Would {action}");
                    ActionOutcome {
                        action,
                        status: ActionStatus::Planned,
                    }
                })
                .collect();
            return ExecutionReport {
                dry_run,
                outcomes,
                unresolved,
                backup_id: None,
            };
        }

        let destroyed: Vec<PathBuf> = actions
            .iter()
            .filter_map(SyncAction::destroys)
            .map(|(side, key)| self.path(side, key))
            .collect();
        let session: Result<Option<BackupSession>> = if destroyed.is_empty() {
            Ok(None)
        } else {
            self.backups.backup(&self.context, &destroyed).map(Some)
        };

        let mut outcomes = Vec::with_capacity(actions.len());
        for action in actions {
            let status = match self.backup_gate(&session, &action) {
                Some(reason) => {
                    tracing::error!(%action, reason = %reason, "skipping action without backup");
                    ActionStatus::BackupFailed(reason)
                }
                None => match self.apply(plan, &action) {
                    Ok(()) => {
                        tracing::info!(%action, "applied");
                        ActionStatus::Applied
                    }
                    Err(e) => {
                        tracing::error!(%action, error = %e, "action failed");
                        ActionStatus::Failed(e.to_string())
                    }
                },
            };
            outcomes.push(ActionOutcome { action, status });
        }

        let backup_id = match &session {
            Ok(Some(session)) => Some(session.id().clone()),
            _ => None,
        };
        ExecutionReport {
            dry_run,
            outcomes,
            unresolved,
            backup_id,
        }
    }

    /// Reason the action must not run, if its pre-image is not backed up
    fn backup_gate(
        &self,
        session: &Result<Option<BackupSession>>,
        action: &SyncAction,
    ) -> Option<String> {
        let (side, key) = action.destroys()?;
        let path = self.path(side, key);
        match session {
            Err(e) => Some(e.to_string()),
            Ok(Some(session)) if !session.covers(&path) => Some(
                session
                    .failures()
                    .iter()
                    .find(|(failed, _)| *failed == path)
                    .map_or_else(|| "not backed up".to_string(), |(_, reason)| reason.clone()),
            ),
            Ok(_) => None,
        }
    }

    fn apply(&self, plan: &SyncPlan, action: &SyncAction) -> Result<()> {
        match action {
            SyncAction::Create { path, to } | SyncAction::Update { path, to } => {
                let from = to.other();
                let expected = plan
                    .records
                    .get(from, path)
                    .ok_or_else(|| missing_record(path, from))?;
                let dest = self.path(*to, path);
                self.write_copy(path, &self.path(from, path), &dest)?;
                self.verify_digest(path, &dest, &expected.digest)
            }
            SyncAction::Delete { path, side } => {
                let target = self.path(*side, path);
                fs::remove_file(&target).map_err(|e| Error::io(&target, e))?;
                fsutil::prune_empty_dirs(target.parent(), self.root(*side));
                self.verify_absent(&target)
            }
            SyncAction::Rename { from, to, side } => {
                let renamed_on = side.other();
                let record = plan
                    .records
                    .get(renamed_on, to)
                    .ok_or_else(|| missing_record(to, renamed_on))?;
                let old = self.path(*side, from);
                let new = self.path(*side, to);
                fsutil::rename(&old, &new)?;
                fsutil::prune_empty_dirs(old.parent(), self.root(*side));

                let moved_is_current = plan
                    .records
                    .baseline
                    .get(from)
                    .is_some_and(|base| base.digest == record.digest);
                if !moved_is_current {
                    self.write_copy(to, &self.path(renamed_on, to), &new)?;
                }
                self.verify_absent(&old)?;
                self.verify_digest(to, &new, &record.digest)
            }
        }
    }

    /// Copy `src` over `dest`, merging selected keys into an existing special file
    fn write_copy(&self, key: &str, src: &Path, dest: &Path) -> Result<()> {
        if let Some(rule) = self.special.lookup(key)
            && dest.exists()
        {
            match scanner::merge(src, dest, rule) {
                Ok(merged) => return fsutil::write_atomic(dest, &merged),
                Err(Error::SpecialHandling { reason, .. }) => {
                    tracing::warn!(path = key, reason = %reason, "cannot merge keys, copying whole file");
                }
                Err(e) => return Err(e),
            }
        }
        fsutil::copy_atomic(src, dest)
    }

    fn verify_digest(&self, key: &str, path: &Path, expected: &ContentDigest) -> Result<()> {
        if !self.verify {
            return Ok(());
        }
        let (actual, _) = scanner::digest_for(self.special, key, path)?;
        if actual == *expected {
            Ok(())
        } else {
            Err(Error::VerificationFailed {
                path: path.to_path_buf(),
                expected: expected.to_string(),
                actual: actual.to_string(),
            })
        }
    }

    fn verify_absent(&self, path: &Path) -> Result<()> {
        if self.verify && path.exists() {
            return Err(Error::VerificationFailed {
                path: path.to_path_buf(),
                expected: "absent".to_string(),
                actual: "present".to_string(),
            });
        }
        Ok(())
    }
}

fn missing_record(path: &str, side: Side) -> Error {
    Error::io(
        path,
        std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("no scanned record on {side}"),
        ),
    )
}
