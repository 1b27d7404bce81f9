//! Shared helpers for integration tests.
//!
//! Each test binary compiles its own copy of this module and typically uses
//! only a subset of the helpers.
#![allow(dead_code)]

use std::path::Path;

use gdl_manager_core::{ManagerPaths, ToolInvocation};

/// Creates the manager directory layout under `root`.
pub fn manager_paths(root: &Path) -> ManagerPaths {
    let paths = ManagerPaths::new(root);
    paths.ensure().unwrap();
    paths
}

/// Writes an executable shell script acting as a fake download tool and
/// returns an invocation for it.
///
/// The script body runs with the job's full argument list in `$@`.
#[cfg(unix)]
pub fn fake_tool(dir: &Path, name: &str, body: &str) -> ToolInvocation {
    use std::os::unix::fs::PermissionsExt;

    let script = dir.join(name);
    std::fs::write(&script, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
    ToolInvocation {
        command: vec![script.display().to_string()],
        resolved: Some(script),
    }
}

/// A script body that appends its full argument list to `record`, then exits
/// with `code`.
#[cfg(unix)]
pub fn recording_body(record: &Path, code: i32) -> String {
    format!("echo \"$@\" >> \"{}\"\nexit {code}", record.display())
}

/// A script body that exits 1 when the final argument (the URL) contains
/// `marker`, 0 otherwise.
#[cfg(unix)]
pub fn fail_marker_body(marker: &str) -> String {
    format!(
        "last=\"\"\nfor a in \"$@\"; do last=\"$a\"; done\ncase \"$last\" in *{marker}*) exit 1;; *) exit 0;; esac"
    )
}

/// Reads recorded invocation lines back.
#[cfg(unix)]
pub fn recorded_lines(record: &Path) -> Vec<String> {
    std::fs::read_to_string(record)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}
