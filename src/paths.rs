//! Directory layout for a manager root.
//!
//! Everything the manager touches lives under a single root directory,
//! selectable with `--root` (defaults to the current directory).

use std::io;
use std::path::{Path, PathBuf};

/// Name of the optional gallery-dl configuration file at the root.
const TOOL_CONFIG_FILE: &str = "gallery-dl.conf";

/// Resolved directory layout under one manager root.
#[derive(Debug, Clone)]
pub struct ManagerPaths {
    /// The root directory itself.
    pub root: PathBuf,
    /// Destination directory handed to gallery-dl (`--dest`).
    pub downloads: PathBuf,
    /// Generated `.url` link files.
    pub links: PathBuf,
    /// One `<site>.txt` URL list per site.
    pub url_lists: PathBuf,
    /// JSON settings files.
    pub config: PathBuf,
    /// Per-site download-archive ledgers (owned by gallery-dl).
    pub archives: PathBuf,
    /// Run-log JSON files.
    pub logs: PathBuf,
    /// Backup zips.
    pub backups: PathBuf,
}

impl ManagerPaths {
    /// Builds the layout for `root` without touching the filesystem.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            downloads: root.join("Downloads"),
            links: root.join("Links"),
            url_lists: root.join("URL-Lists"),
            config: root.join("config"),
            archives: root.join("archives"),
            logs: root.join("logs"),
            backups: root.join("backups"),
            root,
        }
    }

    /// Creates every managed directory that does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns the first directory-creation error.
    pub fn ensure(&self) -> io::Result<()> {
        for dir in [
            &self.downloads,
            &self.links,
            &self.url_lists,
            &self.config,
            &self.archives,
            &self.logs,
            &self.backups,
        ] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    /// Path of the application settings file.
    #[must_use]
    pub fn app_settings_file(&self) -> PathBuf {
        self.config.join("app-settings.json")
    }

    /// Path of the per-site settings file.
    #[must_use]
    pub fn site_settings_file(&self) -> PathBuf {
        self.config.join("site-delays.json")
    }

    /// Path of the optional gallery-dl config file, if it exists.
    #[must_use]
    pub fn tool_config_file(&self) -> Option<PathBuf> {
        let path = self.root.join(TOOL_CONFIG_FILE);
        path.is_file().then_some(path)
    }

    /// Path of the download-archive ledger for `site`.
    #[must_use]
    pub fn archive_file(&self, site: &str) -> PathBuf {
        self.archives.join(format!("{site}.sqlite"))
    }

    /// Path of the URL list for `site`.
    #[must_use]
    pub fn url_list_file(&self, site: &str) -> PathBuf {
        self.url_lists.join(format!("{site}.txt"))
    }
}

impl ManagerPaths {
    /// Convenience constructor from an optional CLI override.
    #[must_use]
    pub fn from_root_arg(root: Option<&Path>) -> Self {
        match root {
            Some(r) => Self::new(r),
            None => Self::new("."),
        }
    }
}
