//! Per-machine baselines: the last state both trees agreed on.
//!
//! One snapshot exists per (tool, machine) at
//! `<state_root>/<tool>/<machine_id>.json`. Snapshots are replaced
//! atomically after a run and never edited in place.

mod snapshot;
mod store;

pub use snapshot::{DeletionDecision, DeletionRecord, SCHEMA_VERSION, Snapshot};
pub use store::StateStore;
