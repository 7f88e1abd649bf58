//! Loading and atomically persisting baselines

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::snapshot::{SCHEMA_VERSION, Snapshot};
use crate::MachineId;
use crate::config::is_simple_name;
use crate::error::{Error, Result};
use crate::fsutil;

/// Baseline store rooted at one state directory
#[derive(Debug, Clone)]
pub struct StateStore {
    root: PathBuf,
}

impl StateStore {
    /// Store rooted at `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// State root directory
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the state file for a (tool, machine) pair
    pub fn path_for(&self, tool: &str, machine: &MachineId) -> Result<PathBuf> {
        if !is_simple_name(tool) {
            return Err(Error::Config(format!("invalid tool name '{tool}'")));
        }
        if !is_simple_name(machine.as_str()) {
            return Err(Error::Config(format!("invalid machine id '{machine}'")));
        }
        Ok(self
            .root
            .join(tool)
            .join(format!("{}.json", machine.as_str())))
    }

    /// Load a baseline; a missing file yields an empty snapshot.
    ///
    /// Fails with [`Error::StateCorruption`] when the file cannot be parsed,
    /// carries another schema version, or belongs to another machine.
    pub fn load(&self, tool: &str, machine: &MachineId) -> Result<Snapshot> {
        let path = self.path_for(tool, machine)?;
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(tool, machine = %machine, "no baseline yet");
                return Ok(Snapshot::empty(machine.clone()));
            }
            Err(e) => return Err(Error::io(&path, e)),
        };

        let snapshot = parse(&path, &content)?;
        if &snapshot.machine_id != machine {
            return Err(Error::StateCorruption {
                path,
                reason: format!("belongs to machine '{}'", snapshot.machine_id),
            });
        }
        Ok(snapshot)
    }

    /// Atomically replace the baseline
    pub fn save(&self, tool: &str, machine: &MachineId, snapshot: &Snapshot) -> Result<()> {
        let path = self.path_for(tool, machine)?;
        let mut content = serde_json::to_vec_pretty(snapshot)?;
        content.push(b'\n');
        fsutil::write_atomic(&path, &content)?;
        tracing::debug!(
            tool,
            path = %path.display(),
            files = snapshot.files.len(),
            deletions = snapshot.deletions.len(),
            "baseline saved"
        );
        Ok(())
    }

    /// Remove the baseline; returns whether one existed
    pub fn reset(&self, tool: &str, machine: &MachineId) -> Result<bool> {
        let path = self.path_for(tool, machine)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!(tool, path = %path.display(), "baseline reset");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::io(&path, e)),
        }
    }

    /// Every machine's baseline for a tool, sorted by machine id.
    ///
    /// Unreadable files are skipped with a warning.
    pub fn list_machines(&self, tool: &str) -> Result<Vec<Snapshot>> {
        let dir = self.root.join(tool);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::io(&dir, e)),
        };

        let mut snapshots = Vec::new();
        for entry in entries.filter_map(std::result::Result::ok) {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            let parsed = fs::read_to_string(&path)
                .map_err(|e| Error::io(&path, e))
                .and_then(|content| parse(&path, &content));
            match parsed {
                Ok(snapshot) => snapshots.push(snapshot),
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping baseline"),
            }
        }
        snapshots.sort_by(|a, b| a.machine_id.cmp(&b.machine_id));
        Ok(snapshots)
    }
}

fn parse(path: &Path, content: &str) -> Result<Snapshot> {
    let corrupt = |reason: String| Error::StateCorruption {
        path: path.to_path_buf(),
        reason,
    };

    let value: serde_json::Value =
        serde_json::from_str(content).map_err(|e| corrupt(e.to_string()))?;
    match value.get("version").and_then(serde_json::Value::as_u64) {
        Some(v) if v == u64::from(SCHEMA_VERSION) => {}
        Some(v) => return Err(corrupt(format!("unsupported schema version {v}"))),
        None => return Err(corrupt("missing schema version".to_string())),
    }
    serde_json::from_value(value).map_err(|e| corrupt(e.to_string()))
}
