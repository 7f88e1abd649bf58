//! Non-interactive decision sources

use std::collections::VecDeque;

use super::{Decision, DecisionSource, PendingDeletion};
use crate::diff::Conflict;
use crate::error::Result;
use crate::state::DeletionDecision;

/// Automatic mode: newer side wins, source deletions wait for a human
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoPolicy;

impl DecisionSource for AutoPolicy {
    fn decide(&mut self, _conflict: &Conflict) -> Result<Decision> {
        Ok(Decision::AutoNewerWins)
    }

    fn confirm_deletion(&mut self, deletion: &PendingDeletion<'_>) -> Result<DeletionDecision> {
        tracing::info!(path = deletion.path, "deferring source deletion until confirmed");
        Ok(DeletionDecision::Pending)
    }
}

/// Never decides; used for dry runs that must not prompt
#[derive(Debug, Clone, Copy, Default)]
pub struct DeferAll;

impl DecisionSource for DeferAll {
    fn decide(&mut self, _conflict: &Conflict) -> Result<Decision> {
        Ok(Decision::Defer)
    }

    fn confirm_deletion(&mut self, _deletion: &PendingDeletion<'_>) -> Result<DeletionDecision> {
        Ok(DeletionDecision::Pending)
    }
}

/// Queued decisions, consumed in order; defers once exhausted
#[derive(Debug, Clone, Default)]
pub struct ScriptedDecisions {
    decisions: VecDeque<Decision>,
    deletions: VecDeque<DeletionDecision>,
}

impl ScriptedDecisions {
    /// Queue conflict decisions
    pub fn new(decisions: impl IntoIterator<Item = Decision>) -> Self {
        Self {
            decisions: decisions.into_iter().collect(),
            deletions: VecDeque::new(),
        }
    }

    /// Queue deletion confirmations
    #[must_use]
    pub fn with_deletions(mut self, deletions: impl IntoIterator<Item = DeletionDecision>) -> Self {
        self.deletions = deletions.into_iter().collect();
        self
    }
}

impl DecisionSource for ScriptedDecisions {
    fn decide(&mut self, _conflict: &Conflict) -> Result<Decision> {
        Ok(self.decisions.pop_front().unwrap_or(Decision::Defer))
    }

    fn confirm_deletion(&mut self, _deletion: &PendingDeletion<'_>) -> Result<DeletionDecision> {
        Ok(self
            .deletions
            .pop_front()
            .unwrap_or(DeletionDecision::Pending))
    }
}

/// Conflict decisions from a closure; deletions are confirmed
pub struct FnDecisions<F> {
    decide: F,
}

impl<F> FnDecisions<F>
where
    F: FnMut(&Conflict) -> Result<Decision>,
{
    /// Wrap a closure
    pub const fn new(decide: F) -> Self {
        Self { decide }
    }
}

impl<F> DecisionSource for FnDecisions<F>
where
    F: FnMut(&Conflict) -> Result<Decision>,
{
    fn decide(&mut self, conflict: &Conflict) -> Result<Decision> {
        (self.decide)(conflict)
    }

    fn confirm_deletion(&mut self, _deletion: &PendingDeletion<'_>) -> Result<DeletionDecision> {
        Ok(DeletionDecision::Confirmed)
    }
}
