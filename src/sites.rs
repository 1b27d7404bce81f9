//! Site discovery and URL-list loading.
//!
//! A "site" is a named, ordered list of target URLs, one `URL-Lists/<name>.txt`
//! file per site. Lists are plain text: blank lines, comment lines (first
//! non-space character `#`) and pure-numeric lines are ignored; every other
//! line is taken literally, in file order. Duplicates are preserved here;
//! deduplication belongs to the link-building stage.

use std::io;

use tracing::debug;

use crate::paths::ManagerPaths;

/// A named, ordered URL list. Immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    /// Site identifier (the URL-list file stem).
    pub name: String,
    /// Target URLs in file order.
    pub urls: Vec<String>,
}

impl Site {
    /// Builds a site value directly; mainly useful in tests.
    #[must_use]
    pub fn new(name: impl Into<String>, urls: Vec<String>) -> Self {
        Self {
            name: name.into(),
            urls,
        }
    }
}

/// Lists known site names: sorted stems of `URL-Lists/*.txt`.
///
/// A missing `URL-Lists/` directory yields an empty list, not an error.
///
/// # Errors
///
/// Returns directory-read errors other than `NotFound`.
pub fn discover_sites(paths: &ManagerPaths) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    let entries = match std::fs::read_dir(&paths.url_lists) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(names),
        Err(err) => return Err(err),
    };
    for entry in entries {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "txt")
            && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
        {
            names.push(stem.to_string());
        }
    }
    names.sort();
    Ok(names)
}

/// Reads the URL list for `site`, applying the line filter.
///
/// A missing list file yields an empty list.
///
/// # Errors
///
/// Returns read errors other than `NotFound`.
pub fn read_site_urls(paths: &ManagerPaths, site: &str) -> io::Result<Vec<String>> {
    let file = paths.url_list_file(site);
    let text = match std::fs::read_to_string(&file) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err),
    };
    let urls = filter_url_lines(&text);
    debug!(site, count = urls.len(), file = %file.display(), "loaded URL list");
    Ok(urls)
}

/// Loads one site by name.
///
/// # Errors
///
/// Propagates [`read_site_urls`] errors.
pub fn load_site(paths: &ManagerPaths, name: &str) -> io::Result<Site> {
    Ok(Site {
        name: name.to_string(),
        urls: read_site_urls(paths, name)?,
    })
}

/// Loads every known site, in name order.
///
/// # Errors
///
/// Propagates discovery and read errors.
pub fn load_all_sites(paths: &ManagerPaths) -> io::Result<Vec<Site>> {
    discover_sites(paths)?
        .iter()
        .map(|name| load_site(paths, name))
        .collect()
}

/// Applies the URL-list line filter to raw file text.
fn filter_url_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !line.starts_with('#'))
        .filter(|line| !line.chars().all(|c| c.is_ascii_digit()))
        .map(str::to_string)
        .collect()
}

/// Extracts the network host from a URL string, if it has one.
pub fn extract_host(url: &str) -> Option<String> {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
}
