//! Single-job execution against the external downloader.
//!
//! One [`ToolRunner`] invocation downloads one URL: it builds the external
//! tool's argument list, launches the child process, and supervises it to
//! completion. Supervision is an explicit state machine (`Running` →
//! `Completed` / `ForceKilled`) driven by a 100 ms poll so a pending
//! interrupt is observed mid-flight instead of blocking until the child
//! exits on its own.
//!
//! Exit-code convention: 0 is success, 130 means "terminated by interrupt",
//! reported for every orchestrator-initiated kill regardless of what the
//! child reports, and also the degraded result of a failed launch, keeping
//! the orchestration loop's error handling uniform. Everything else is a
//! plain failure.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tracing::{debug, instrument, warn};

use crate::argsplit;
use crate::interrupt::InterruptFlag;
use crate::paths::ManagerPaths;
use crate::settings::{AppSettings, SiteConfig};
use crate::tool::ToolInvocation;

/// Conventional exit code for interrupted/killed jobs.
pub const EXIT_CODE_INTERRUPTED: i32 = 130;

/// Poll interval while supervising a running child.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How long a child gets to exit after a graceful termination request
/// before it is force-killed.
const TERMINATE_GRACE: Duration = Duration::from_secs(2);

/// Classified result of one job attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// Exit code 0.
    Success,
    /// Non-zero, non-interrupt exit code.
    Failure(i32),
    /// Exit code 130.
    Interrupted,
}

impl JobOutcome {
    /// Classifies a raw exit code.
    #[must_use]
    pub fn from_exit_code(code: i32) -> Self {
        match code {
            0 => Self::Success,
            EXIT_CODE_INTERRUPTED => Self::Interrupted,
            other => Self::Failure(other),
        }
    }
}

/// Executes one download job for one URL, returning the raw exit code.
///
/// The orchestrator depends on this seam rather than on a concrete process
/// so tests can script outcomes.
#[async_trait]
pub trait JobInvoker: Send + Sync {
    /// Runs one job to completion (or termination) and returns its exit code.
    async fn invoke(&self, url: &str) -> i32;
}

/// Supervision states for one child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SupervisionState {
    /// The child is running; keep polling.
    Running,
    /// The child exited by itself with this code.
    Completed(i32),
    /// The orchestrator terminated the child.
    ForceKilled,
}

/// [`JobInvoker`] that drives the real external tool.
#[derive(Debug)]
pub struct ToolRunner {
    invocation: ToolInvocation,
    dest: PathBuf,
    archive: PathBuf,
    config_file: Option<PathBuf>,
    global_args: Vec<String>,
    site_args: Vec<String>,
    interrupt: InterruptFlag,
}

impl ToolRunner {
    /// Builds a runner for one site run.
    ///
    /// Free-form argument strings from settings are tokenized here; a string
    /// that fails to tokenize is dropped with a warning rather than aborting
    /// the run.
    #[must_use]
    pub fn for_site(
        invocation: ToolInvocation,
        paths: &ManagerPaths,
        site: &str,
        app: &AppSettings,
        config: &SiteConfig,
        interrupt: InterruptFlag,
    ) -> Self {
        Self {
            invocation,
            dest: paths.downloads.clone(),
            archive: paths.archive_file(site),
            config_file: paths.tool_config_file(),
            global_args: tokenize_or_empty(&app.global_extra_args, "global extra args"),
            site_args: tokenize_or_empty(&config.extra_args, "site extra args"),
            interrupt,
        }
    }

    /// Builds the job argument list (everything after the invocation tokens):
    /// archive ledger, destination, optional config file, global args, site
    /// args, then the URL itself.
    #[must_use]
    pub fn build_job_args(&self, url: &str) -> Vec<String> {
        let mut args = vec![
            "--download-archive".to_string(),
            self.archive.display().to_string(),
            "--dest".to_string(),
            self.dest.display().to_string(),
        ];
        if let Some(config_file) = &self.config_file {
            args.push("--config".to_string());
            args.push(config_file.display().to_string());
        }
        args.extend(self.global_args.iter().cloned());
        args.extend(self.site_args.iter().cloned());
        args.push(url.to_string());
        args
    }

    /// Polls the child until it exits or a pending interrupt demands
    /// termination.
    async fn supervise(&self, child: &mut Child) -> i32 {
        let mut state = SupervisionState::Running;
        loop {
            match state {
                SupervisionState::Running => {
                    match child.try_wait() {
                        Ok(Some(status)) => {
                            state = SupervisionState::Completed(exit_code_of(status));
                        }
                        Ok(None) => {
                            if self.interrupt.is_raised() {
                                state = terminate(child).await;
                            } else {
                                tokio::time::sleep(POLL_INTERVAL).await;
                            }
                        }
                        Err(error) => {
                            warn!(%error, "lost track of child process, force-killing");
                            let _ = child.start_kill();
                            let _ = child.wait().await;
                            state = SupervisionState::ForceKilled;
                        }
                    }
                }
                SupervisionState::Completed(code) => return code,
                SupervisionState::ForceKilled => return EXIT_CODE_INTERRUPTED,
            }
        }
    }
}

#[async_trait]
impl JobInvoker for ToolRunner {
    #[instrument(skip(self), fields(tool = %self.invocation.display()))]
    async fn invoke(&self, url: &str) -> i32 {
        let job_args = self.build_job_args(url);
        debug!(args = ?job_args, "launching download job");

        let mut command = Command::new(self.invocation.program());
        command
            .args(self.invocation.leading_args())
            .args(&job_args)
            .kill_on_drop(true);

        match command.spawn() {
            Ok(mut child) => self.supervise(&mut child).await,
            Err(error) => {
                // Launch failures degrade to the interrupted path (130).
                warn!(%error, url, "failed to launch download tool");
                EXIT_CODE_INTERRUPTED
            }
        }
    }
}

/// Requests graceful termination, waits out the grace period, then
/// force-kills. Always reports `ForceKilled`: an orchestrator-initiated stop
/// is 130 no matter what the child manages to report on its way down.
async fn terminate(child: &mut Child) -> SupervisionState {
    debug!("interrupt pending, terminating child");
    request_graceful_stop(child);

    let deadline = tokio::time::Instant::now() + TERMINATE_GRACE;
    while tokio::time::Instant::now() < deadline {
        if let Ok(Some(_)) = child.try_wait() {
            return SupervisionState::ForceKilled;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }

    warn!("child unresponsive to graceful stop, force-killing");
    let _ = child.start_kill();
    let _ = child.wait().await;
    SupervisionState::ForceKilled
}

/// Asks the child to stop without killing it outright (SIGTERM on unix).
#[cfg(unix)]
fn request_graceful_stop(child: &Child) {
    if let Some(pid) = child.id() {
        // SAFETY: plain kill(2) with a valid pid from a live child handle.
        unsafe {
            libc::kill(pid as libc::pid_t, libc::SIGTERM);
        }
    }
}

/// No portable graceful stop; the force-kill in [`terminate`] handles it.
#[cfg(not(unix))]
fn request_graceful_stop(_child: &Child) {}

/// Maps an exit status to the exit-code convention. A status without a code
/// (killed by a signal) is indistinguishable from an interrupt, so it maps
/// to 130.
fn exit_code_of(status: std::process::ExitStatus) -> i32 {
    status.code().unwrap_or(EXIT_CODE_INTERRUPTED)
}

fn tokenize_or_empty(input: &str, what: &str) -> Vec<String> {
    match argsplit::split(input) {
        Ok(tokens) => tokens,
        Err(error) => {
            warn!(%error, what, "dropping untokenizable argument string");
            Vec::new()
        }
    }
}
