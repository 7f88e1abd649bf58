//! Atomic file replacement helpers.
//!
//! Every write goes to a temporary file in the destination directory and is
//! renamed into place, so a crash never leaves a half-written config file.

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::time::SystemTime;

use crate::error::{Error, Result};

/// Prefix for temporary files; the scanner never reports these
pub(crate) const TEMP_PREFIX: &str = ".agentsync-";

fn temp_in(dir: &Path) -> Result<tempfile::NamedTempFile> {
    tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| Error::io(dir, e))
}

fn ensure_parent(path: &Path) -> Result<&Path> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    Ok(parent)
}

/// Write `content` to `path` atomically, creating parent directories.
///
/// An existing file keeps its permissions.
pub(crate) fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let parent = ensure_parent(path)?;
    let mut temp = temp_in(parent)?;
    temp.write_all(content)
        .and_then(|()| temp.as_file().sync_all())
        .map_err(|e| Error::io(temp.path(), e))?;
    if let Ok(existing) = fs::metadata(path) {
        temp.as_file()
            .set_permissions(existing.permissions())
            .map_err(|e| Error::io(temp.path(), e))?;
    }
    temp.persist(path).map_err(|e| Error::io(path, e.error))?;
    Ok(())
}

/// Copy `src` over `dest` atomically, carrying the source permissions and
/// modification time.
pub(crate) fn copy_atomic(src: &Path, dest: &Path) -> Result<()> {
    let parent = ensure_parent(dest)?;
    let mut reader = fs::File::open(src).map_err(|e| Error::io(src, e))?;
    let metadata = reader.metadata().map_err(|e| Error::io(src, e))?;
    let modified = metadata.modified().map_err(|e| Error::io(src, e))?;

    let mut temp = temp_in(parent)?;
    io::copy(&mut reader, temp.as_file_mut()).map_err(|e| Error::io(dest, e))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| Error::io(temp.path(), e))?;
    preserve_mtime(temp.as_file(), modified);
    temp.as_file()
        .set_permissions(metadata.permissions())
        .map_err(|e| Error::io(temp.path(), e))?;
    temp.persist(dest).map_err(|e| Error::io(dest, e.error))?;
    Ok(())
}

fn preserve_mtime(file: &fs::File, modified: SystemTime) {
    if let Err(e) = file.set_modified(modified) {
        tracing::debug!(error = %e, "could not preserve modification time");
    }
}

/// Move `from` to `to` within one tree, creating parents of `to`.
pub(crate) fn rename(from: &Path, to: &Path) -> Result<()> {
    ensure_parent(to)?;
    fs::rename(from, to).map_err(|e| Error::io(from, e))
}

/// Remove empty directories from `start` upward, stopping at `root`.
pub(crate) fn prune_empty_dirs(start: Option<&Path>, root: &Path) {
    let mut current = start;
    while let Some(dir) = current {
        if dir == root || !dir.starts_with(root) {
            break;
        }
        // remove_dir fails on non-empty directories, which ends the walk
        if fs::remove_dir(dir).is_err() {
            break;
        }
        tracing::debug!(dir = %dir.display(), "removed empty directory");
        current = dir.parent();
    }
}
