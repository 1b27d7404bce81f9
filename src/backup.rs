//! Backup-zip creation.
//!
//! Packs the recoverable state (settings, URL lists, and the per-site
//! download-archive ledgers) into a timestamped zip under `backups/`.
//! Downloads themselves are not included.

use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};

use chrono::Local;
use thiserror::Error;
use tracing::{debug, info};
use zip::CompressionMethod;
use zip::write::FileOptions;

use crate::paths::ManagerPaths;

/// Errors from backup creation.
#[derive(Debug, Error)]
pub enum BackupError {
    /// Reading source files or writing the zip failed.
    #[error("I/O error creating backup: {0}")]
    Io(#[from] io::Error),
    /// The zip writer rejected an entry.
    #[error("zip error creating backup: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// Creates a backup zip and returns its path.
///
/// # Errors
///
/// Returns [`BackupError`] on any I/O or zip failure.
pub fn create_backup(paths: &ManagerPaths) -> Result<PathBuf, BackupError> {
    std::fs::create_dir_all(&paths.backups)?;
    let stamp = Local::now().format("%Y%m%d-%H%M%S");
    let out_path = paths.backups.join(format!("gdl-manager-backup-{stamp}.zip"));

    let file = File::create(&out_path)?;
    let mut zip = zip::ZipWriter::new(BufWriter::new(file));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut entries = 0usize;
    entries += add_dir_recursive(&mut zip, options, &paths.root, &paths.config)?;
    entries += add_dir_filtered(&mut zip, options, &paths.root, &paths.url_lists, Some("txt"))?;
    entries += add_dir_recursive(&mut zip, options, &paths.root, &paths.archives)?;

    zip.finish()?;
    info!(path = %out_path.display(), entries, "backup written");
    Ok(out_path)
}

type Writer = zip::ZipWriter<BufWriter<File>>;

/// Adds every file under `dir` (recursively), archived relative to `root`.
fn add_dir_recursive(
    zip: &mut Writer,
    options: FileOptions,
    root: &Path,
    dir: &Path,
) -> Result<usize, BackupError> {
    add_dir(zip, options, root, dir, None)
}

/// Adds files under `dir` whose extension matches, archived relative to
/// `root`.
fn add_dir_filtered(
    zip: &mut Writer,
    options: FileOptions,
    root: &Path,
    dir: &Path,
    extension: Option<&str>,
) -> Result<usize, BackupError> {
    add_dir(zip, options, root, dir, extension)
}

fn add_dir(
    zip: &mut Writer,
    options: FileOptions,
    root: &Path,
    dir: &Path,
    extension: Option<&str>,
) -> Result<usize, BackupError> {
    if !dir.is_dir() {
        return Ok(0);
    }
    let mut count = 0;
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            count += add_dir(zip, options, root, &path, extension)?;
            continue;
        }
        if let Some(ext) = extension
            && !path.extension().is_some_and(|e| e == ext)
        {
            continue;
        }
        let name = path
            .strip_prefix(root)
            .unwrap_or(&path)
            .to_string_lossy()
            .replace('\\', "/");
        zip.start_file(&name, options)?;
        let mut reader = BufReader::new(File::open(&path)?);
        io::copy(&mut reader, zip)?;
        debug!(entry = %name, "added to backup");
        count += 1;
    }
    Ok(count)
}
