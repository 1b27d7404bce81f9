//! JSON settings persistence.
//!
//! Two flat files under `config/`:
//!
//! - `app-settings.json`: global settings ([`AppSettings`]): the configured
//!   gallery-dl invocation and global pass-through arguments.
//! - `site-delays.json`: per-site pacing and arguments ([`SiteConfig`]),
//!   keyed by site name.
//!
//! Loaders are tolerant by design: a missing file or missing field falls back
//! to defaults (`ConfigMissing` is not fatal), and every load normalizes what
//! it reads: newly discovered sites are seeded, and `--sleep <value>` pairs
//! are stripped from a site's `extra_args` whenever its `base_sleep_secs` is
//! positive, because the orchestrator owns sleep timing exclusively in that
//! mode. The file is rewritten only when normalization changed something.

use std::collections::BTreeMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::argsplit;
use crate::paths::ManagerPaths;

/// Default delay between URLs within one site, in seconds.
pub const DEFAULT_DELAY_BETWEEN_URLS_SECS: u64 = 30;
/// Default randomized pre-attempt sleep base, in seconds.
pub const DEFAULT_BASE_SLEEP_SECS: u64 = 1;
/// Default jitter bound around the base sleep, in seconds.
pub const DEFAULT_JITTER_SECS: f64 = 1.0;

/// Errors from settings persistence.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Reading or writing a settings file failed.
    #[error("I/O error accessing settings: {0}")]
    Io(#[from] std::io::Error),
    /// A settings file held unparseable JSON.
    #[error("invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Global application settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppSettings {
    /// Explicit gallery-dl invocation (command line, possibly multi-token).
    /// `None` means "search the fallback candidates".
    #[serde(default)]
    pub tool_path: Option<String>,
    /// Extra arguments appended to every invocation, before site arguments.
    #[serde(default)]
    pub global_extra_args: String,
}

impl AppSettings {
    /// Loads global settings, falling back to defaults when the file is
    /// missing or unreadable.
    ///
    /// # Errors
    ///
    /// Returns I/O errors other than `NotFound`.
    pub fn load(paths: &ManagerPaths) -> Result<Self, SettingsError> {
        let file = paths.app_settings_file();
        let mut settings: Self = match fs::read_to_string(&file) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|error| {
                warn!(%error, file = %file.display(), "unreadable app settings, using defaults");
                Self::default()
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(err) => return Err(err.into()),
        };
        settings.global_extra_args = settings.global_extra_args.trim().to_string();
        Ok(settings)
    }

    /// Persists global settings.
    ///
    /// # Errors
    ///
    /// Returns I/O or serialization errors.
    pub fn save(&self, paths: &ManagerPaths) -> Result<(), SettingsError> {
        write_json_pretty(&paths.app_settings_file(), self)
    }
}

/// Per-site pacing and argument settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Fixed delay between consecutive URLs, seconds.
    #[serde(default = "default_delay_between_urls")]
    pub delay_between_urls_secs: u64,
    /// Base of the randomized pre-attempt sleep, seconds. Zero disables it.
    #[serde(default = "default_base_sleep")]
    pub base_sleep_secs: u64,
    /// Jitter bound (±) around the base sleep, seconds.
    #[serde(default = "default_jitter")]
    pub jitter_secs: f64,
    /// Extra gallery-dl arguments for this site, as one free-form string.
    #[serde(default)]
    pub extra_args: String,
}

fn default_delay_between_urls() -> u64 {
    DEFAULT_DELAY_BETWEEN_URLS_SECS
}

fn default_base_sleep() -> u64 {
    DEFAULT_BASE_SLEEP_SECS
}

fn default_jitter() -> f64 {
    DEFAULT_JITTER_SECS
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            delay_between_urls_secs: DEFAULT_DELAY_BETWEEN_URLS_SECS,
            base_sleep_secs: DEFAULT_BASE_SLEEP_SECS,
            jitter_secs: DEFAULT_JITTER_SECS,
            extra_args: String::new(),
        }
    }
}

impl SiteConfig {
    /// Returns this config with `extra_args` normalized.
    ///
    /// Whitespace is trimmed, and when `base_sleep_secs > 0` any
    /// `--sleep <value>` token pair is removed so the external tool does not
    /// sleep on top of the orchestrator's pacing. A trailing lone `--sleep`
    /// (no value) is left alone. An untokenizable string is kept verbatim.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        self.extra_args = self.extra_args.trim().to_string();
        if self.base_sleep_secs == 0 || self.extra_args.is_empty() {
            return self;
        }
        match argsplit::split(&self.extra_args) {
            Ok(tokens) => {
                let kept = strip_sleep_pairs(&tokens);
                if kept.len() != tokens.len() {
                    debug!("stripped --sleep from site extra args");
                    self.extra_args = argsplit::join(&kept);
                }
            }
            Err(error) => {
                warn!(%error, "could not tokenize extra args, leaving unchanged");
            }
        }
        self
    }
}

/// Removes `--sleep <value>` pairs from a token list.
fn strip_sleep_pairs(tokens: &[String]) -> Vec<String> {
    let mut kept = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        if tokens[i] == "--sleep" && i + 1 < tokens.len() {
            i += 2;
            continue;
        }
        kept.push(tokens[i].clone());
        i += 1;
    }
    kept
}

/// The persisted site → [`SiteConfig`] mapping.
#[derive(Debug, Clone, Default)]
pub struct SiteSettings {
    map: BTreeMap<String, SiteConfig>,
}

impl SiteSettings {
    /// Builds a store from an in-memory mapping, without touching disk.
    #[must_use]
    pub fn from_map(map: BTreeMap<String, SiteConfig>) -> Self {
        Self {
            map: map
                .into_iter()
                .map(|(site, cfg)| (site, cfg.sanitized()))
                .collect(),
        }
    }

    /// Loads the per-site settings file and normalizes it against the
    /// currently known sites.
    ///
    /// Normalization seeds defaults for unseen `known_sites`, back-fills
    /// missing fields (via serde defaults) and sanitizes every record. The
    /// file is rewritten only when this changed its content.
    ///
    /// # Errors
    ///
    /// Returns I/O errors other than `NotFound`, and write errors from the
    /// rewrite.
    pub fn load(paths: &ManagerPaths, known_sites: &[String]) -> Result<Self, SettingsError> {
        let file = paths.site_settings_file();
        let raw: BTreeMap<String, SiteConfig> = match fs::read_to_string(&file) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|error| {
                warn!(%error, file = %file.display(), "unreadable site settings, reseeding");
                BTreeMap::new()
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(err.into()),
        };

        let mut map: BTreeMap<String, SiteConfig> = raw
            .iter()
            .map(|(site, cfg)| (site.clone(), cfg.clone().sanitized()))
            .collect();
        for site in known_sites {
            map.entry(site.clone()).or_default();
        }

        let settings = Self { map };
        if settings.map != raw {
            settings.save(paths)?;
        }
        Ok(settings)
    }

    /// Persists the mapping.
    ///
    /// # Errors
    ///
    /// Returns I/O or serialization errors.
    pub fn save(&self, paths: &ManagerPaths) -> Result<(), SettingsError> {
        write_json_pretty(&paths.site_settings_file(), &self.map)
    }

    /// Returns the config for `site`, or defaults when unknown.
    #[must_use]
    pub fn get(&self, site: &str) -> SiteConfig {
        self.map.get(site).cloned().unwrap_or_default()
    }

    /// Stores a (sanitized) config for `site` and persists the mapping.
    ///
    /// # Errors
    ///
    /// Returns write errors.
    pub fn set(
        &mut self,
        paths: &ManagerPaths,
        site: &str,
        config: SiteConfig,
    ) -> Result<(), SettingsError> {
        self.map.insert(site.to_string(), config.sanitized());
        self.save(paths)
    }

    /// Iterates over all stored `(site, config)` records.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &SiteConfig)> {
        self.map.iter()
    }
}

/// Writes a value as pretty JSON, creating parent directories as needed.
fn write_json_pretty<T: Serialize>(path: &Path, value: &T) -> Result<(), SettingsError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = fs::File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
