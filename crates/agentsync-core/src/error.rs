//! Error types shared by every stage of the sync pipeline.
//!
//! File-level problems are reported through warnings and per-action
//! outcomes; only root, state and configuration problems surface as `Err`
//! from a whole-tool operation.

use std::path::{Path, PathBuf};

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the sync engine
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A tree root could not be read; aborts that tool's run
    #[error("Cannot scan {}: {source}", root.display())]
    Scan {
        /// Root directory that failed
        root: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Baseline exists but cannot be trusted; requires an operator reset
    #[error("Sync state at {} is corrupt: {reason} (run `agentsync reset-state` to start over)", path.display())]
    StateCorruption {
        /// State file path
        path: PathBuf,
        /// What failed to parse or validate
        reason: String,
    },

    /// A conflict reached execution without a terminal resolution
    #[error("Conflict on {path} is unresolved")]
    ConflictUnresolved {
        /// Relative path of the conflicted file
        path: String,
    },

    /// The pre-image of a destructive action could not be saved
    #[error("Cannot back up {}: {reason}", path.display())]
    BackupFailure {
        /// File that should have been backed up
        path: PathBuf,
        /// Failure description
        reason: String,
    },

    /// A written file does not hash to the digest it was copied from
    #[error("Verification failed for {}: expected {expected}, found {actual}", path.display())]
    VerificationFailed {
        /// File that was written or deleted
        path: PathBuf,
        /// Expected digest (or `absent`)
        expected: String,
        /// Digest found on disk (or `present`)
        actual: String,
    },

    /// A stored backup copy does not hash to the digest in its manifest
    #[error("Backup copy for {} does not match its manifest (expected {expected}, found {actual})", path.display())]
    RestoreValidation {
        /// Original path of the entry
        path: PathBuf,
        /// Digest recorded in the manifest
        expected: String,
        /// Digest of the stored copy
        actual: String,
    },

    /// No backup with this identifier exists
    #[error("Backup not found: {0}")]
    BackupNotFound(String),

    /// Configuration could not be located or parsed
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration parsed but failed validation
    #[error("Invalid configuration:\n  - {}", .0.join("\n  - "))]
    InvalidConfig(Vec<String>),

    /// Include or exclude pattern failed to compile
    #[error("Invalid pattern '{pattern}': {reason}")]
    Pattern {
        /// Offending pattern
        pattern: String,
        /// Compiler message
        reason: String,
    },

    /// `extract_keys` handling failed for a file
    #[error("Cannot extract keys from {}: {reason}", path.display())]
    SpecialHandling {
        /// File being processed
        path: PathBuf,
        /// Failure description
        reason: String,
    },

    /// I/O error tied to a path
    #[error("{}: {source}", path.display())]
    Io {
        /// Path being accessed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// JSON encoding or decoding error
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML decoding error
    #[error(transparent)]
    Yaml(#[from] serde_yml::Error),

    /// Run stopped by a user interrupt between tools
    #[error("Interrupted before this tool started")]
    Interrupted,

    /// The decision source asked to stop this tool's run
    #[error("Sync aborted by user")]
    Aborted,
}

impl Error {
    /// Wrap an I/O error with the path it concerns
    pub(crate) fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_lists_every_problem() {
        let err = Error::InvalidConfig(vec!["first".to_string(), "second".to_string()]);
        let message = err.to_string();
        assert!(message.contains("- first"));
        assert!(message.contains("- second"));
    }

    #[test]
    fn test_io_keeps_path() {
        let err = Error::io("/tmp/a.md", std::io::Error::from(std::io::ErrorKind::NotFound));
        assert!(err.to_string().contains("/tmp/a.md"));
    }
}
