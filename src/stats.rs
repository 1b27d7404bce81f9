//! Run statistics and run-log persistence.
//!
//! One [`RunStats`] accumulates counts across one or many site runs within a
//! single invocation. Counts are append-only; the orchestration loop is the
//! only writer. `skipped` counts URLs bypassed by a Skip decision before any
//! job attempt; a Skip issued after an interrupted attempt counts under
//! `failed` instead: no work was done in the first case, a failed unit of
//! work happened in the second.
//!
//! At the end of a run the stats are finalized into a [`RunLogRecord`] and
//! written to `logs/run-<tag>-<timestamp>.json`.

use std::collections::BTreeMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::paths::ManagerPaths;

/// Errors from run-log persistence.
#[derive(Debug, Error)]
pub enum RunLogError {
    /// Reading or writing a run-log file failed.
    #[error("I/O error accessing run log: {0}")]
    Io(#[from] std::io::Error),
    /// A run-log file held unparseable JSON.
    #[error("invalid run log JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Per-site counters within one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteRunStats {
    /// Job invocations that actually occurred.
    pub attempted: u64,
    /// Attempts that exited with code 0.
    pub ok: u64,
    /// Attempts classified as failed.
    pub fail: u64,
}

/// Aggregated counters and timing for one run invocation.
#[derive(Debug)]
pub struct RunStats {
    started_wall: DateTime<Local>,
    started: Instant,
    attempted: u64,
    succeeded: u64,
    failed: u64,
    skipped: u64,
    per_site: BTreeMap<String, SiteRunStats>,
}

impl Default for RunStats {
    fn default() -> Self {
        Self::new()
    }
}

impl RunStats {
    /// Starts a new aggregation at the current wall-clock time.
    #[must_use]
    pub fn new() -> Self {
        Self {
            started_wall: Local::now(),
            started: Instant::now(),
            attempted: 0,
            succeeded: 0,
            failed: 0,
            skipped: 0,
            per_site: BTreeMap::new(),
        }
    }

    /// Records that a job invocation occurred for `site`.
    pub fn record_attempt(&mut self, site: &str) {
        self.attempted += 1;
        self.site_entry(site).attempted += 1;
    }

    /// Records a successful attempt for `site`.
    pub fn record_success(&mut self, site: &str) {
        self.succeeded += 1;
        self.site_entry(site).ok += 1;
    }

    /// Records a failed attempt for `site`.
    pub fn record_failure(&mut self, site: &str) {
        self.failed += 1;
        self.site_entry(site).fail += 1;
    }

    /// Records a URL skipped before any attempt was made.
    ///
    /// Deliberately not tracked per site: a skipped URL is not a unit of
    /// site work, only a run-level count.
    pub fn record_skip(&mut self) {
        self.skipped += 1;
    }

    /// Makes sure `site` appears in the per-site map even with zero counts.
    pub fn touch_site(&mut self, site: &str) {
        let _ = self.site_entry(site);
    }

    fn site_entry(&mut self, site: &str) -> &mut SiteRunStats {
        self.per_site.entry(site.to_string()).or_default()
    }

    /// Total attempted count.
    #[must_use]
    pub fn attempted(&self) -> u64 {
        self.attempted
    }

    /// Total succeeded count.
    #[must_use]
    pub fn succeeded(&self) -> u64 {
        self.succeeded
    }

    /// Total failed count.
    #[must_use]
    pub fn failed(&self) -> u64 {
        self.failed
    }

    /// Total pre-attempt skip count.
    #[must_use]
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Per-site counters for `site`, if it was touched this run.
    #[must_use]
    pub fn site(&self, site: &str) -> Option<SiteRunStats> {
        self.per_site.get(site).copied()
    }

    /// Finalizes into a serializable record; elapsed time is computed now.
    #[must_use]
    pub fn to_record(&self) -> RunLogRecord {
        RunLogRecord {
            start: self.started_wall.format("%Y-%m-%dT%H:%M:%S").to_string(),
            elapsed_sec: round2(self.started.elapsed().as_secs_f64()),
            attempted: self.attempted,
            succeeded: self.succeeded,
            failed: self.failed,
            skipped: self.skipped,
            per_site: self.per_site.clone(),
        }
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// The serialized shape of one run log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunLogRecord {
    /// Wall-clock start, second precision.
    pub start: String,
    /// Wall-clock duration of the run in seconds.
    pub elapsed_sec: f64,
    /// Total job invocations.
    pub attempted: u64,
    /// Total successes.
    pub succeeded: u64,
    /// Total failures.
    pub failed: u64,
    /// Total pre-attempt skips.
    pub skipped: u64,
    /// Per-site breakdown.
    pub per_site: BTreeMap<String, SiteRunStats>,
}

/// Writes the finalized stats to `logs/run-<tag>-<timestamp>.json`.
///
/// # Errors
///
/// Returns I/O or serialization errors.
pub fn write_run_log(
    paths: &ManagerPaths,
    stats: &RunStats,
    tag: &str,
) -> Result<PathBuf, RunLogError> {
    fs::create_dir_all(&paths.logs)?;
    let stamp = Local::now().format("%Y%m%d-%H%M%S");
    let path = paths.logs.join(format!("run-{tag}-{stamp}.json"));
    let file = fs::File::create(&path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &stats.to_record())?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    debug!(path = %path.display(), "run log written");
    Ok(path)
}

/// Lists run-log paths, oldest first.
///
/// # Errors
///
/// Returns directory-read errors other than `NotFound`.
pub fn list_run_logs(paths: &ManagerPaths) -> Result<Vec<PathBuf>, RunLogError> {
    let mut logs = Vec::new();
    let entries = match fs::read_dir(&paths.logs) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(logs),
        Err(err) => return Err(err.into()),
    };
    for entry in entries {
        let path = entry?.path();
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if name.starts_with("run-") && name.ends_with(".json") {
            logs.push(path);
        }
    }
    logs.sort();
    Ok(logs)
}

/// Reads one run-log file back into a record.
///
/// # Errors
///
/// Returns I/O or parse errors.
pub fn read_run_log(path: &std::path::Path) -> Result<RunLogRecord, RunLogError> {
    Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, ManagerPaths) {
        let tmp = TempDir::new().unwrap();
        let paths = ManagerPaths::new(tmp.path());
        paths.ensure().unwrap();
        (tmp, paths)
    }

    #[test]
    fn test_counts_accumulate_per_site_and_total() {
        let mut stats = RunStats::new();
        stats.record_attempt("a");
        stats.record_success("a");
        stats.record_attempt("a");
        stats.record_failure("a");
        stats.record_attempt("b");
        stats.record_success("b");
        stats.record_skip();

        assert_eq!(stats.attempted(), 3);
        assert_eq!(stats.succeeded(), 2);
        assert_eq!(stats.failed(), 1);
        assert_eq!(stats.skipped(), 1);
        assert_eq!(
            stats.site("a"),
            Some(SiteRunStats {
                attempted: 2,
                ok: 1,
                fail: 1
            })
        );
        assert_eq!(
            stats.site("b"),
            Some(SiteRunStats {
                attempted: 1,
                ok: 1,
                fail: 0
            })
        );
    }

    #[test]
    fn test_touch_site_registers_zero_counts() {
        let mut stats = RunStats::new();
        stats.touch_site("quiet");
        assert_eq!(stats.site("quiet"), Some(SiteRunStats::default()));
        assert_eq!(stats.site("never"), None);
    }

    #[test]
    fn test_record_shape_matches_run_log_contract() {
        let mut stats = RunStats::new();
        stats.record_attempt("example");
        stats.record_success("example");
        let record = stats.to_record();

        let json = serde_json::to_value(&record).unwrap();
        assert!(json["start"].is_string());
        assert!(json["elapsed_sec"].is_number());
        assert_eq!(json["attempted"], 1);
        assert_eq!(json["succeeded"], 1);
        assert_eq!(json["failed"], 0);
        assert_eq!(json["skipped"], 0);
        assert_eq!(json["per_site"]["example"]["attempted"], 1);
        assert_eq!(json["per_site"]["example"]["ok"], 1);
        assert_eq!(json["per_site"]["example"]["fail"], 0);
    }

    #[test]
    fn test_write_then_read_run_log_round_trips() {
        let (_tmp, paths) = setup();
        let mut stats = RunStats::new();
        stats.record_attempt("example");
        stats.record_failure("example");

        let path = write_run_log(&paths, &stats, "example").unwrap();
        assert!(
            path.file_name()
                .unwrap()
                .to_str()
                .unwrap()
                .starts_with("run-example-")
        );

        let record = read_run_log(&path).unwrap();
        assert_eq!(record.attempted, 1);
        assert_eq!(record.failed, 1);
        assert_eq!(record.per_site["example"].fail, 1);
    }

    #[test]
    fn test_list_run_logs_filters_and_sorts() {
        let (_tmp, paths) = setup();
        std::fs::write(paths.logs.join("run-b-20260101-000000.json"), "{}").unwrap();
        std::fs::write(paths.logs.join("run-a-20260101-000000.json"), "{}").unwrap();
        std::fs::write(paths.logs.join("notes.txt"), "").unwrap();

        let logs = list_run_logs(&paths).unwrap();
        let names: Vec<_> = logs
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(
            names,
            vec!["run-a-20260101-000000.json", "run-b-20260101-000000.json"]
        );
    }

    #[test]
    fn test_list_run_logs_missing_dir_is_empty() {
        let tmp = TempDir::new().unwrap();
        let paths = ManagerPaths::new(tmp.path().join("nope"));
        assert!(list_run_logs(&paths).unwrap().is_empty());
    }
}
