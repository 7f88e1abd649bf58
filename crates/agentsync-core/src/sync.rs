//! Sync pipeline: scan, classify, resolve, execute, persist
//!
//! [`SyncEngine`] drives one pipeline per tool. Plans come from the diff
//! engine, decisions from a [`crate::resolve::DecisionSource`], and the
//! [`PlanExecutor`] applies what was decided with a backup taken before any
//! content is destroyed. The baseline only advances for paths the run
//! actually settled.

mod actions;
mod baseline;
mod executor;
mod orchestrator;
mod reporting;

pub use actions::{SyncAction, SyncActionResolver};
pub use baseline::advance;
pub use executor::{ActionOutcome, ActionStatus, ExecutionReport, PlanExecutor};
pub use orchestrator::{SyncEngine, SyncOptions, ToolReport, ToolRun, ToolStatus};
pub use reporting::{SyncCounts, SyncReporter};
