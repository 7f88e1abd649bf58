//! Ordered actions derived from a resolved plan

use std::fmt;

use crate::diff::{Side, SyncPlan};

/// One filesystem action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    /// Copy a file that does not exist on `to` yet
    Create {
        /// Relative path
        path: String,
        /// Side written
        to: Side,
    },
    /// Overwrite an existing file on `to`
    Update {
        /// Relative path
        path: String,
        /// Side written
        to: Side,
    },
    /// Remove a file from `side`
    Delete {
        /// Relative path
        path: String,
        /// Side the file is removed from
        side: Side,
    },
    /// Move `from` to `to` on `side`
    Rename {
        /// Old relative path
        from: String,
        /// New relative path
        to: String,
        /// Side the move is applied to
        side: Side,
    },
}

impl SyncAction {
    /// Side and path whose current content this action destroys, if any
    #[must_use]
    pub fn destroys(&self) -> Option<(Side, &str)> {
        match self {
            Self::Create { .. } => None,
            Self::Update { path, to } => Some((*to, path)),
            Self::Delete { path, side } => Some((*side, path)),
            Self::Rename { from, side, .. } => Some((*side, from)),
        }
    }
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create { path, to } => write!(f, "create {to}/{path}"),
            Self::Update { path, to } => write!(f, "update {to}/{path}"),
            Self::Delete { path, side } => write!(f, "delete {side}/{path}"),
            Self::Rename { from, to, side } => write!(f, "rename {side}/{from} -> {to}"),
        }
    }
}

/// Resolves a plan into its ordered action list
pub struct SyncActionResolver;

impl SyncActionResolver {
    /// Create a new action resolver
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Actions in execution order: renames, copies to target, copies to
    /// source, deletes from target, deletes from source. Pending conflicts
    /// produce no action.
    #[must_use]
    pub fn resolve(plan: &SyncPlan) -> Vec<SyncAction> {
        let mut actions = Vec::with_capacity(plan.action_count());

        actions.extend(plan.renames.iter().map(|rename| SyncAction::Rename {
            from: rename.from.clone(),
            to: rename.to.clone(),
            side: rename.apply_on(),
        }));

        for (paths, to) in [
            (&plan.copy_to_target, Side::Target),
            (&plan.copy_to_source, Side::Source),
        ] {
            actions.extend(paths.iter().map(|path| {
                let path = path.clone();
                if plan.records.get(to, &path).is_some() {
                    SyncAction::Update { path, to }
                } else {
                    SyncAction::Create { path, to }
                }
            }));
        }

        for (paths, side) in [
            (&plan.delete_from_target, Side::Target),
            (&plan.delete_from_source, Side::Source),
        ] {
            actions.extend(paths.iter().map(|path| SyncAction::Delete {
                path: path.clone(),
                side,
            }));
        }

        actions
    }
}

impl Default for SyncActionResolver {
    fn default() -> Self {
        Self::new()
    }
}
