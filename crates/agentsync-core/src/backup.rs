//! Pre-image backups taken before destructive actions, with restore and
//! retention.
//!
//! Layout: `<backup_dir>/<backup_id>/manifest.json` plus `files/<n>-<name>`.
//! A `.in-progress` marker lives beside the manifest while the run that
//! created the backup is still executing; `clean` never removes such a
//! backup.

mod manifest;

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::Utc;

pub use manifest::{BackupContext, BackupEntry, BackupId, BackupManifest, MANIFEST_FILE};

use crate::error::{Error, Result};
use crate::fsutil;
use crate::scanner::FileHasher;

const IN_PROGRESS: &str = ".in-progress";
const FILES_DIR: &str = "files";

/// Markers older than this belong to a crashed run
const STALE_MARKER: Duration = Duration::from_secs(24 * 60 * 60);

/// Backup manager rooted at the configured backup directory
#[derive(Debug, Clone)]
pub struct BackupManager {
    root: PathBuf,
}

/// A backup whose run is still executing.
///
/// Dropping the session removes the in-progress marker.
#[derive(Debug)]
pub struct BackupSession {
    manifest: BackupManifest,
    dir: PathBuf,
    failures: Vec<(PathBuf, String)>,
}

impl BackupSession {
    /// Identifier of the backup
    #[must_use]
    pub const fn id(&self) -> &BackupId {
        &self.manifest.backup_id
    }

    /// Manifest as written
    #[must_use]
    pub const fn manifest(&self) -> &BackupManifest {
        &self.manifest
    }

    /// Paths that could not be backed up, with the reason
    #[must_use]
    pub fn failures(&self) -> &[(PathBuf, String)] {
        &self.failures
    }

    /// Whether `path` has a pre-image in this backup
    #[must_use]
    pub fn covers(&self, path: &Path) -> bool {
        self.manifest
            .entries
            .iter()
            .any(|entry| entry.original_path == path)
    }
}

impl Drop for BackupSession {
    fn drop(&mut self) {
        let marker = self.dir.join(IN_PROGRESS);
        match fs::remove_file(&marker) {
            Err(e) if e.kind() != ErrorKind::NotFound => {
                tracing::warn!(path = %marker.display(), error = %e, "cannot remove in-progress marker");
            }
            _ => {}
        }
    }
}

/// Per-entry outcome of a restore
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    /// Entries copied back
    pub restored: Vec<PathBuf>,
    /// Entries whose original already had the backed-up content
    pub already_current: Vec<PathBuf>,
    /// Entries whose stored copy failed verification and were not confirmed
    pub validation_failed: Vec<PathBuf>,
    /// Entries that could not be copied back
    pub failed: Vec<(PathBuf, String)>,
}

impl RestoreReport {
    /// Whether every entry ended up restored or already current
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.validation_failed.is_empty() && self.failed.is_empty()
    }
}

impl BackupManager {
    /// Manager for a backup root
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Backup root directory
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Save the pre-image of every path before a destructive action.
    ///
    /// Paths that fail are listed in [`BackupSession::failures`]; the caller
    /// must not touch them. Fails as a whole when nothing could be saved.
    pub fn backup(&self, context: &BackupContext, paths: &[PathBuf]) -> Result<BackupSession> {
        let (id, dir) = self.allocate(context)?;
        let failure = |path: &Path, reason: String| Error::BackupFailure {
            path: path.to_path_buf(),
            reason,
        };

        fs::create_dir_all(dir.join(FILES_DIR)).map_err(|e| failure(&dir, e.to_string()))?;
        fs::write(dir.join(IN_PROGRESS), std::process::id().to_string())
            .map_err(|e| failure(&dir, e.to_string()))?;

        let mut session = BackupSession {
            manifest: BackupManifest {
                backup_id: id,
                created_at: Utc::now(),
                tool: context.tool.clone(),
                machine_id: context.machine_id.clone(),
                operation: context.operation,
                entries: Vec::new(),
            },
            dir,
            failures: Vec::new(),
        };

        for (index, path) in paths.iter().enumerate() {
            match Self::store(&session.dir, index + 1, path) {
                Ok(entry) => session.manifest.entries.push(entry),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "backup failed");
                    session.failures.push((path.clone(), e.to_string()));
                }
            }
        }

        if session.manifest.entries.is_empty() {
            let (path, reason) = session
                .failures
                .first()
                .cloned()
                .unwrap_or_else(|| (session.dir.clone(), "nothing to back up".to_string()));
            if let Err(e) = fs::remove_dir_all(&session.dir) {
                tracing::debug!(error = %e, "cannot remove empty backup");
            }
            return Err(failure(&path, reason));
        }

        let manifest = serde_json::to_vec_pretty(&session.manifest)?;
        fsutil::write_atomic(&session.dir.join(MANIFEST_FILE), &manifest)
            .map_err(|e| failure(&session.dir, e.to_string()))?;

        tracing::info!(
            backup = %session.id(),
            files = session.manifest.entries.len(),
            "backup created"
        );
        Ok(session)
    }

    fn allocate(&self, context: &BackupContext) -> Result<(BackupId, PathBuf)> {
        let base = BackupId::generate(Utc::now(), context.operation, &context.tool);
        fs::create_dir_all(&self.root).map_err(|e| Error::BackupFailure {
            path: self.root.clone(),
            reason: e.to_string(),
        })?;

        let mut id = base.clone();
        let mut suffix = 1;
        loop {
            let dir = self.root.join(id.as_str());
            match fs::create_dir(&dir) {
                Ok(()) => return Ok((id, dir)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    suffix += 1;
                    id = base.with_suffix(suffix);
                }
                Err(e) => {
                    return Err(Error::BackupFailure {
                        path: dir,
                        reason: e.to_string(),
                    });
                }
            }
        }
    }

    fn store(dir: &Path, index: usize, path: &Path) -> Result<BackupEntry> {
        let digest = FileHasher::hash(path)?;
        let name = path
            .file_name()
            .map_or_else(|| "file".into(), |n| n.to_string_lossy());
        let stored = PathBuf::from(FILES_DIR).join(format!("{index:04}-{name}"));
        fsutil::copy_atomic(path, &dir.join(&stored))?;

        let copied = FileHasher::hash(&dir.join(&stored))?;
        if copied != digest {
            return Err(Error::BackupFailure {
                path: path.to_path_buf(),
                reason: "file changed while being backed up".to_string(),
            });
        }
        Ok(BackupEntry {
            original_path: path.to_path_buf(),
            digest,
            stored_copy_path: stored,
        })
    }

    /// Manifests, newest first, optionally for one tool only.
    ///
    /// Directories without a readable manifest are skipped with a warning.
    pub fn list(&self, tool: Option<&str>) -> Result<Vec<BackupManifest>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::io(&self.root, e)),
        };

        let mut manifests = Vec::new();
        for entry in entries.filter_map(std::result::Result::ok) {
            let manifest_path = entry.path().join(MANIFEST_FILE);
            if !manifest_path.is_file() {
                continue;
            }
            match read_manifest(&manifest_path) {
                Ok(manifest) if tool.is_none_or(|t| manifest.tool == t) => {
                    manifests.push(manifest);
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(path = %manifest_path.display(), error = %e, "skipping backup");
                }
            }
        }
        manifests.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.backup_id.cmp(&a.backup_id))
        });
        Ok(manifests)
    }

    /// Load one manifest
    pub fn load(&self, id: &BackupId) -> Result<BackupManifest> {
        let path = self.root.join(id.as_str()).join(MANIFEST_FILE);
        if !path.is_file() {
            return Err(Error::BackupNotFound(id.to_string()));
        }
        read_manifest(&path)
    }

    /// Copy every stored pre-image back to its original path.
    ///
    /// A stored copy that no longer matches its manifest digest is only
    /// restored when `confirm` returns `true` for the validation error. An
    /// original that already has the backed-up content is left alone.
    pub fn restore(
        &self,
        id: &BackupId,
        confirm: &mut dyn FnMut(&Error) -> bool,
    ) -> Result<RestoreReport> {
        let manifest = self.load(id)?;
        let dir = self.root.join(id.as_str());
        let mut report = RestoreReport::default();

        for entry in &manifest.entries {
            let stored = dir.join(&entry.stored_copy_path);
            let original = &entry.original_path;

            let actual = match FileHasher::hash(&stored) {
                Ok(actual) => actual,
                Err(e) => {
                    report.failed.push((original.clone(), e.to_string()));
                    continue;
                }
            };
            if actual != entry.digest {
                let mismatch = Error::RestoreValidation {
                    path: original.clone(),
                    expected: entry.digest.to_string(),
                    actual: actual.to_string(),
                };
                tracing::warn!("{mismatch}");
                if !confirm(&mismatch) {
                    report.validation_failed.push(original.clone());
                    continue;
                }
            }

            if FileHasher::hash(original).is_ok_and(|current| current == actual) {
                tracing::warn!(path = %original.display(), "already matches backup, skipping");
                report.already_current.push(original.clone());
                continue;
            }

            match fsutil::copy_atomic(&stored, original) {
                Ok(()) => {
                    tracing::info!(path = %original.display(), "restored");
                    report.restored.push(original.clone());
                }
                Err(e) => report.failed.push((original.clone(), e.to_string())),
            }
        }
        Ok(report)
    }

    /// Remove backups older than `retention_days` or beyond the newest
    /// `retention_count`, oldest first. Returns the removed identifiers.
    pub fn clean(&self, retention_days: u32, retention_count: usize) -> Result<Vec<BackupId>> {
        let cutoff = Utc::now() - chrono::Duration::days(i64::from(retention_days));
        let manifests = self.list(None)?;

        let mut removed = Vec::new();
        for (rank, manifest) in manifests.iter().enumerate().rev() {
            if rank < retention_count && manifest.created_at >= cutoff {
                continue;
            }
            let dir = self.root.join(manifest.backup_id.as_str());
            if is_in_progress(&dir) {
                tracing::debug!(backup = %manifest.backup_id, "in progress, keeping");
                continue;
            }
            fs::remove_dir_all(&dir).map_err(|e| Error::io(&dir, e))?;
            tracing::info!(backup = %manifest.backup_id, "backup removed");
            removed.push(manifest.backup_id.clone());
        }
        Ok(removed)
    }
}

fn read_manifest(path: &Path) -> Result<BackupManifest> {
    let content = fs::read(path).map_err(|e| Error::io(path, e))?;
    Ok(serde_json::from_slice(&content)?)
}

fn is_in_progress(dir: &Path) -> bool {
    fs::metadata(dir.join(IN_PROGRESS))
        .and_then(|m| m.modified())
        .is_ok_and(|modified| {
            SystemTime::now()
                .duration_since(modified)
                .map_or(true, |age| age < STALE_MARKER)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MachineId;
    use crate::diff::SyncMode;
    use tempfile::TempDir;

    fn context(tool: &str) -> BackupContext {
        BackupContext {
            tool: tool.to_string(),
            machine_id: MachineId::new("host-00000000"),
            operation: SyncMode::Push,
        }
    }

    fn setup() -> (TempDir, BackupManager, PathBuf) {
        let tmp = TempDir::new().unwrap();
        let manager = BackupManager::new(tmp.path().join("backups"));
        let tree = tmp.path().join("tree");
        fs::create_dir_all(&tree).unwrap();
        (tmp, manager, tree)
    }

    #[test]
    fn test_backup_then_restore_reproduces_pre_image() {
        let (_tmp, manager, tree) = setup();
        let file = tree.join("CLAUDE.md");
        fs::write(&file, "original").unwrap();

        let id = {
            let session = manager.backup(&context("claude"), &[file.clone()]).unwrap();
            assert!(session.covers(&file));
            assert!(session.failures().is_empty());
            session.id().clone()
        };
        fs::write(&file, "overwritten").unwrap();

        let report = manager.restore(&id, &mut |_| false).unwrap();

        assert_eq!(report.restored, vec![file.clone()]);
        assert_eq!(fs::read_to_string(&file).unwrap(), "original");
    }

    #[test]
    fn test_restore_recreates_deleted_file() {
        let (_tmp, manager, tree) = setup();
        let file = tree.join("skills/a/SKILL.md");
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(&file, "skill").unwrap();
        let id = manager.backup(&context("claude"), &[file.clone()]).unwrap().id().clone();
        fs::remove_dir_all(tree.join("skills")).unwrap();

        let report = manager.restore(&id, &mut |_| false).unwrap();

        assert!(report.is_success());
        assert_eq!(fs::read_to_string(&file).unwrap(), "skill");
    }

    #[test]
    fn test_restore_is_idempotent() {
        let (_tmp, manager, tree) = setup();
        let file = tree.join("a.md");
        fs::write(&file, "same").unwrap();
        let id = manager.backup(&context("claude"), &[file.clone()]).unwrap().id().clone();

        let report = manager.restore(&id, &mut |_| false).unwrap();

        assert!(report.restored.is_empty());
        assert_eq!(report.already_current, vec![file]);
    }

    #[test]
    fn test_tampered_copy_needs_confirmation() {
        let (_tmp, manager, tree) = setup();
        let file = tree.join("a.md");
        fs::write(&file, "original").unwrap();
        let session = manager.backup(&context("claude"), &[file.clone()]).unwrap();
        let id = session.id().clone();
        let stored = manager
            .root()
            .join(id.as_str())
            .join(&session.manifest().entries[0].stored_copy_path);
        drop(session);
        fs::write(&stored, "tampered").unwrap();
        fs::write(&file, "current").unwrap();

        let mut seen = Vec::new();
        let declined = manager
            .restore(&id, &mut |e| {
                seen.push(matches!(e, Error::RestoreValidation { .. }));
                false
            })
            .unwrap();
        assert_eq!(declined.validation_failed, vec![file.clone()]);
        assert_eq!(seen, vec![true]);
        assert_eq!(fs::read_to_string(&file).unwrap(), "current");

        let confirmed = manager.restore(&id, &mut |_| true).unwrap();
        assert_eq!(confirmed.restored, vec![file.clone()]);
        assert_eq!(fs::read_to_string(&file).unwrap(), "tampered");
    }

    #[test]
    fn test_missing_path_is_reported() {
        let (_tmp, manager, tree) = setup();
        let present = tree.join("present.md");
        fs::write(&present, "x").unwrap();
        let missing = tree.join("missing.md");

        let session = manager
            .backup(&context("claude"), &[present.clone(), missing.clone()])
            .unwrap();

        assert!(session.covers(&present));
        assert_eq!(session.failures().len(), 1);
        assert_eq!(session.failures()[0].0, missing);
    }

    #[test]
    fn test_nothing_backed_up_is_failure() {
        let (_tmp, manager, tree) = setup();
        let err = manager
            .backup(&context("claude"), &[tree.join("missing.md")])
            .unwrap_err();
        assert!(matches!(err, Error::BackupFailure { .. }));
        assert!(manager.list(None).unwrap().is_empty());
    }

    #[test]
    fn test_list_filters_and_orders() {
        let (_tmp, manager, tree) = setup();
        let file = tree.join("a.md");
        fs::write(&file, "x").unwrap();
        let first = manager.backup(&context("claude"), &[file.clone()]).unwrap().id().clone();
        let second = manager.backup(&context("codex"), &[file.clone()]).unwrap().id().clone();

        let all: Vec<_> = manager.list(None).unwrap().into_iter().map(|m| m.backup_id).collect();
        assert_eq!(all.len(), 2);
        assert!(all.contains(&first) && all.contains(&second));

        let codex = manager.list(Some("codex")).unwrap();
        assert_eq!(codex.len(), 1);
        assert_eq!(codex[0].backup_id, second);
    }

    #[test]
    fn test_clean_by_count_keeps_newest() {
        let (_tmp, manager, tree) = setup();
        let file = tree.join("a.md");
        fs::write(&file, "x").unwrap();
        for _ in 0..3 {
            manager.backup(&context("claude"), &[file.clone()]).unwrap();
        }
        let newest = manager.list(None).unwrap()[0].backup_id.clone();

        let removed = manager.clean(30, 1).unwrap();

        assert_eq!(removed.len(), 2);
        let left: Vec<_> = manager.list(None).unwrap().into_iter().map(|m| m.backup_id).collect();
        assert_eq!(left, vec![newest]);
    }

    #[test]
    fn test_clean_by_age() {
        let (_tmp, manager, tree) = setup();
        let file = tree.join("a.md");
        fs::write(&file, "x").unwrap();
        let id = manager.backup(&context("claude"), &[file]).unwrap().id().clone();
        let manifest_path = manager.root().join(id.as_str()).join(MANIFEST_FILE);
        let mut manifest = manager.load(&id).unwrap();
        manifest.created_at = Utc::now() - chrono::Duration::days(45);
        fs::write(&manifest_path, serde_json::to_vec(&manifest).unwrap()).unwrap();

        let removed = manager.clean(30, 10).unwrap();

        assert_eq!(removed, vec![id]);
    }

    #[test]
    fn test_clean_skips_in_progress() {
        let (_tmp, manager, tree) = setup();
        let file = tree.join("a.md");
        fs::write(&file, "x").unwrap();
        let session = manager.backup(&context("claude"), &[file]).unwrap();

        assert!(manager.clean(30, 0).unwrap().is_empty());

        drop(session);
        assert_eq!(manager.clean(30, 0).unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_backup() {
        let (_tmp, manager, _tree) = setup();
        let id = BackupId::parse("20990101-000000-000-push-none").unwrap();
        assert!(matches!(
            manager.restore(&id, &mut |_| true),
            Err(Error::BackupNotFound(_))
        ));
    }
}
