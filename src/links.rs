//! Link-file generation from URL lists.
//!
//! For every site, writes one `InternetShortcut` `.url` file per unique URL
//! under `Links/<site>/`, plus a plain-text manifest of the deduplicated
//! list. Dedup happens here, preserving first-seen order; the URL lists
//! themselves keep duplicates.

use std::collections::HashSet;
use std::fs;

use thiserror::Error;
use tracing::{debug, info};

use crate::paths::ManagerPaths;
use crate::sites::Site;

/// Path segments too generic to name a link file after.
const SKIP_SEGMENTS: [&str; 5] = ["user", "users", "profile", "channel", "channels"];

/// Errors from link building.
#[derive(Debug, Error)]
pub enum LinksError {
    /// Writing a link file or directory failed.
    #[error("I/O error building links: {0}")]
    Io(#[from] std::io::Error),
}

/// Builds link files for every given site. Returns the number of link files
/// written.
///
/// # Errors
///
/// Returns the first I/O error; partially written sites are left as-is.
pub fn build_link_files(paths: &ManagerPaths, sites: &[Site]) -> Result<usize, LinksError> {
    let mut written = 0;
    for site in sites {
        let site_dir = paths.links.join(&site.name);
        fs::create_dir_all(&site_dir)?;

        let unique = dedup_preserving_order(&site.urls);
        for url in &unique {
            let file = site_dir.join(format!("{}.url", url_to_filename(url)));
            fs::write(&file, format!("[InternetShortcut]\nURL={url}\n"))?;
            written += 1;
        }

        let manifest = paths
            .links
            .join(format!("#{}_links_from_lists.txt", site.name));
        fs::write(&manifest, unique.join("\n"))?;
        debug!(site = %site.name, links = unique.len(), "site links built");
    }
    info!(written, "link files built");
    Ok(written)
}

fn dedup_preserving_order(urls: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    urls.iter()
        .filter(|url| seen.insert(url.as_str()))
        .cloned()
        .collect()
}

/// Derives a filesystem-safe name from a URL's path.
///
/// Uses the last path segment that is not one of the generic
/// [`SKIP_SEGMENTS`], reduced to alphanumerics, `-` and `_`.
#[must_use]
pub fn url_to_filename(url: &str) -> String {
    let path = url::Url::parse(url)
        .map(|u| u.path().trim_matches('/').to_string())
        .unwrap_or_default();
    if path.is_empty() {
        return "root".to_string();
    }
    let base = path
        .split('/')
        .filter(|segment| {
            !segment.is_empty() && !SKIP_SEGMENTS.contains(&segment.to_lowercase().as_str())
        })
        .next_back()
        .unwrap_or("link");
    let safe: String = base
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '-' | '_'))
        .collect();
    if safe.is_empty() {
        "link".to_string()
    } else {
        safe
    }
}
