//! # agentsync-core
//!
//! Stateful three-way synchronisation engine for agentic coding tool
//! configuration (`~/.claude`, `~/.codex`, ...).
//!
//! A run for one tool is a sequential pipeline:
//! scan both trees, load the per-machine baseline, classify every path,
//! resolve conflicts, back up pre-images, apply the plan, and persist the
//! superseding baseline. Independent tools may run concurrently.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Error taxonomy for the engine
pub mod error;

/// Configuration model, loading and validation
pub mod config;

/// Directory scanning, content digests and `extract_keys` handling
pub mod scanner;

/// Per-machine baseline snapshots
pub mod state;

/// Three-way classification of source, target and baseline
pub mod diff;

/// Conflict and deletion decisions
pub mod resolve;

/// Pre-image backups, restore and retention
pub mod backup;

/// Plan execution and per-tool orchestration
pub mod sync;

mod fsutil;
mod machine;

pub use error::{Error, Result};
pub use machine::MachineId;
