//! Resolution of the external gallery-dl invocation.
//!
//! The invocation comes from settings when configured, otherwise from a fixed
//! fallback search order: the `gallery-dl`/`gallery_dl` executables on PATH,
//! then `python3 -m gallery_dl` / `python -m gallery_dl`. Version probing is
//! best-effort text; the latest published version is looked up through
//! `pip index versions` when a pip is available.

use std::path::{Path, PathBuf};
use std::time::Duration;

use regex::Regex;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

use crate::argsplit;
use crate::settings::AppSettings;

/// Time limit for the package-index lookup.
const INDEX_LOOKUP_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors from tool resolution and probing.
#[derive(Debug, Error)]
pub enum ToolError {
    /// No gallery-dl invocation could be resolved. Fatal for a run.
    #[error(
        "gallery-dl not found: configure an explicit command or install it on PATH"
    )]
    NotFound,
    /// Running the tool to probe its version failed.
    #[error("failed to probe tool version: {0}")]
    VersionProbe(#[from] std::io::Error),
}

/// A resolved external-tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    /// Command tokens: program followed by leading arguments
    /// (e.g. `["python3", "-m", "gallery_dl"]`).
    pub command: Vec<String>,
    /// Resolved path of the program, when PATH lookup found one.
    pub resolved: Option<PathBuf>,
}

impl ToolInvocation {
    /// The program token.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.command[0]
    }

    /// The argument tokens that precede any per-job arguments.
    #[must_use]
    pub fn leading_args(&self) -> &[String] {
        &self.command[1..]
    }

    /// Single-line display form.
    #[must_use]
    pub fn display(&self) -> String {
        self.command.join(" ")
    }
}

/// Resolves the gallery-dl invocation from settings or the fallback order.
///
/// A configured `tool_path` wins when its program token exists as a file or
/// resolves on PATH; otherwise the fallback candidates are searched.
///
/// # Errors
///
/// Returns [`ToolError::NotFound`] when nothing resolves.
#[instrument(skip(settings))]
pub fn find_tool(settings: &AppSettings) -> Result<ToolInvocation, ToolError> {
    if let Some(configured) = settings.tool_path.as_deref() {
        let configured = configured.trim();
        if !configured.is_empty() {
            match invocation_from_command_line(configured) {
                Some(invocation) => {
                    debug!(command = %invocation.display(), "using configured tool command");
                    return Ok(invocation);
                }
                None => {
                    warn!(configured, "configured tool command does not resolve, searching PATH");
                }
            }
        }
    }

    for name in ["gallery-dl", "gallery_dl"] {
        if let Ok(path) = which::which(name) {
            debug!(name, path = %path.display(), "found tool on PATH");
            return Ok(ToolInvocation {
                command: vec![name.to_string()],
                resolved: Some(path),
            });
        }
    }

    for python in ["python3", "python"] {
        if let Ok(path) = which::which(python) {
            debug!(python, "falling back to module invocation");
            return Ok(ToolInvocation {
                command: vec![
                    python.to_string(),
                    "-m".to_string(),
                    "gallery_dl".to_string(),
                ],
                resolved: Some(path),
            });
        }
    }

    Err(ToolError::NotFound)
}

/// Builds an invocation from a configured command line, if its program
/// token exists as a file or resolves on PATH.
fn invocation_from_command_line(line: &str) -> Option<ToolInvocation> {
    let command = match argsplit::split(line) {
        Ok(tokens) if !tokens.is_empty() => tokens,
        _ => return None,
    };
    let program = Path::new(&command[0]);
    if program.is_file() {
        return Some(ToolInvocation {
            resolved: Some(program.to_path_buf()),
            command,
        });
    }
    match which::which(&command[0]) {
        Ok(path) => Some(ToolInvocation {
            resolved: Some(path),
            command,
        }),
        Err(_) => None,
    }
}

/// Probes the tool's own version string (`--version`), best-effort text.
///
/// # Errors
///
/// Returns [`ToolError::VersionProbe`] when the process cannot be run.
pub async fn probe_version(invocation: &ToolInvocation) -> Result<String, ToolError> {
    let output = Command::new(invocation.program())
        .args(invocation.leading_args())
        .arg("--version")
        .output()
        .await?;
    let mut text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if text.is_empty() {
        text = String::from_utf8_lossy(&output.stderr).trim().to_string();
    }
    Ok(text)
}

/// Looks up the latest published gallery-dl version via `pip index versions`.
///
/// Best-effort: returns `None` when no pip is available, the lookup times
/// out, or the output yields no version.
pub async fn latest_published_version() -> Option<String> {
    let pip = ["pip", "pip3"]
        .iter()
        .find_map(|name| which::which(name).ok())?;
    let lookup = Command::new(&pip)
        .args(["index", "versions", "gallery-dl"])
        .output();
    let output = match tokio::time::timeout(INDEX_LOOKUP_TIMEOUT, lookup).await {
        Ok(Ok(output)) => output,
        Ok(Err(error)) => {
            debug!(%error, "package index lookup failed");
            return None;
        }
        Err(_) => {
            debug!("package index lookup timed out");
            return None;
        }
    };
    let text = String::from_utf8_lossy(&output.stdout);
    parse_latest_version(&text)
}

/// Extracts a version from pip output: a `LATEST:` line when present,
/// otherwise the first dotted version number anywhere in the text.
fn parse_latest_version(output: &str) -> Option<String> {
    for line in output.lines() {
        if let Some((prefix, rest)) = line.split_once(':')
            && prefix.trim().eq_ignore_ascii_case("latest")
        {
            let version = rest.trim();
            if !version.is_empty() {
                return Some(version.to_string());
            }
        }
    }
    // regex compile is infallible for this literal pattern
    let pattern = Regex::new(r"\b\d+\.\d+\.\d+\b").ok()?;
    pattern.find(output).map(|m| m.as_str().to_string())
}
