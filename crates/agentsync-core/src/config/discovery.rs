//! Configuration file discovery

use std::path::{Path, PathBuf};

/// File name of the default configuration in the home directory
pub const DEFAULT_FILE_NAME: &str = ".agentsync.yaml";

/// Config file discovery
pub struct ConfigDiscovery;

impl ConfigDiscovery {
    /// Create a new config discovery instance
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Resolve which configuration file to load.
    ///
    /// An explicit path (from `--config` or `AGENTSYNC_CONFIG`) always wins,
    /// even when it does not exist, so the caller reports it. Otherwise
    /// `~/.agentsync.yaml` is used, falling back to the XDG location
    /// `<config_dir>/agentsync/config.yaml` when only that one exists.
    #[must_use]
    pub fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }

        let home = Self::default_path();
        if home.as_ref().is_some_and(|p| p.is_file()) {
            return home;
        }

        Self::find_xdg_config().or(home)
    }

    /// `~/.agentsync.yaml`, if a home directory is known
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(DEFAULT_FILE_NAME))
    }

    fn find_xdg_config() -> Option<PathBuf> {
        let candidate = dirs::config_dir()?.join("agentsync").join("config.yaml");
        candidate.is_file().then_some(candidate)
    }
}

impl Default for ConfigDiscovery {
    fn default() -> Self {
        Self::new()
    }
}
