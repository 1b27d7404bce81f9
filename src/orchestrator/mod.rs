//! Sequential download orchestration.
//!
//! One site at a time, one URL at a time. The orchestrator owns the per-URL
//! state machine: consult the interrupt flag, apply pacing, invoke the job
//! runner, classify the outcome, update statistics. URLs within a site and
//! sites within a batch are processed strictly sequentially; the host-side
//! rate limits are the point, not a missing optimization.
//!
//! Interrupts surface at exactly two checkpoints: before each URL attempt,
//! and after an attempt reports the interrupted exit code. Each detection
//! prompts the operator for one of Abort / Skip / Continue; decisions are
//! never cached across interrupts.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use crate::interrupt::InterruptFlag;
use crate::pacing::{compute_sleep, sleep_interruptible};
use crate::preflight::check_site;
use crate::runner::{JobInvoker, JobOutcome};
use crate::settings::{SiteConfig, SiteSettings};
use crate::sites::Site;
use crate::stats::RunStats;

/// The operator's answer to a detected interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptDecision {
    /// Stop processing the current site (and batch) now.
    Abort,
    /// Drop the current URL and move on.
    Skip,
    /// Carry on (retrying the current URL when one was interrupted).
    Continue,
}

impl InterruptDecision {
    /// Parses an operator's reply: empty input or a leading `a` aborts, a
    /// leading `s` skips, anything else continues.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        let reply = input.trim().to_ascii_lowercase();
        if reply.is_empty() || reply.starts_with('a') {
            Self::Abort
        } else if reply.starts_with('s') {
            Self::Skip
        } else {
            Self::Continue
        }
    }
}

/// Asks the operator what to do about a detected interrupt.
///
/// Each interrupt re-prompts; implementations must not cache answers.
#[async_trait]
pub trait DecisionPrompt: Send + Sync {
    /// Blocks until the operator decides.
    async fn ask(&self) -> InterruptDecision;
}

/// Interactive [`DecisionPrompt`] on the controlling terminal.
#[derive(Debug, Default)]
pub struct ConsolePrompt;

#[async_trait]
impl DecisionPrompt for ConsolePrompt {
    async fn ask(&self) -> InterruptDecision {
        tokio::task::spawn_blocking(|| {
            use std::io::Write;

            eprint!("\nInterrupt detected - [A]bort site, [S]kip this URL, [C]ontinue? ");
            let _ = std::io::stderr().flush();
            let mut line = String::new();
            match std::io::stdin().read_line(&mut line) {
                Ok(_) => InterruptDecision::parse(&line),
                Err(_) => InterruptDecision::Abort,
            }
        })
        .await
        .unwrap_or(InterruptDecision::Abort)
    }
}

/// How a site run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteOutcome {
    /// Every URL in the sequence was processed.
    Completed,
    /// An Abort decision stopped the site early.
    Aborted,
}

/// Runs all of one site's URLs through the job runner.
///
/// Counting rules: `attempted` increments whenever a job invocation actually
/// occurred; a Skip before any attempt counts as `skipped` (run-level only);
/// a Skip after an interrupted attempt counts as `failed`. A Continue after
/// an interrupted attempt retries that URL exactly once, without a second
/// pacing sleep, and the retry is classified by its own exit code.
#[instrument(skip_all, fields(site = %site.name))]
pub async fn run_site(
    site: &Site,
    config: &SiteConfig,
    runner: &dyn JobInvoker,
    prompt: &dyn DecisionPrompt,
    interrupt: &InterruptFlag,
    stats: &mut RunStats,
) -> SiteOutcome {
    if site.urls.is_empty() {
        info!("no URLs for site");
        return SiteOutcome::Completed;
    }
    stats.touch_site(&site.name);

    let total = site.urls.len();
    info!(
        urls = total,
        base_sleep_secs = config.base_sleep_secs,
        jitter_secs = config.jitter_secs,
        delay_between_urls_secs = config.delay_between_urls_secs,
        "starting site run"
    );

    for (idx, url) in site.urls.iter().enumerate() {
        let position = idx + 1;

        // Checkpoint (a): pending interrupt before this attempt.
        if interrupt.take() {
            match prompt.ask().await {
                InterruptDecision::Abort => {
                    info!(position, total, "aborting site");
                    return SiteOutcome::Aborted;
                }
                InterruptDecision::Skip => {
                    stats.record_skip();
                    info!(position, total, %url, "skipping URL before attempt");
                    continue;
                }
                InterruptDecision::Continue => {}
            }
        }

        let pause = compute_sleep(config.base_sleep_secs, config.jitter_secs);
        if !pause.is_zero() {
            debug!(
                sleep_ms = pause.as_millis() as u64,
                position, total, "pre-attempt sleep"
            );
            // A mid-sleep interrupt skips the rest of the wait; the attempt
            // below then reports 130 and checkpoint (b) handles it.
            let _ = sleep_interruptible(pause, interrupt).await;
        }

        let started = Instant::now();
        info!(position, total, %url, "START");
        let code = runner.invoke(url).await;
        stats.record_attempt(&site.name);

        match JobOutcome::from_exit_code(code) {
            JobOutcome::Success => {
                stats.record_success(&site.name);
                info!(position, total, elapsed_secs = started.elapsed().as_secs(), "OK");
            }
            JobOutcome::Failure(code) => {
                stats.record_failure(&site.name);
                warn!(position, total, code, "FAIL");
            }
            JobOutcome::Interrupted => {
                // Checkpoint (b): the attempt itself was interrupted. Clear
                // the flag first so one interrupt yields one prompt.
                let _ = interrupt.take();
                match prompt.ask().await {
                    InterruptDecision::Abort => {
                        info!(position, total, "aborting site after interrupted attempt");
                        return SiteOutcome::Aborted;
                    }
                    InterruptDecision::Skip => {
                        // A partial attempt happened; that is a failed unit
                        // of work, not a skip.
                        stats.record_failure(&site.name);
                        warn!(position, total, %url, "skipped after interrupt, counted as failed");
                        continue;
                    }
                    InterruptDecision::Continue => {
                        info!(position, total, %url, "retrying after interrupt");
                        let retry_code = runner.invoke(url).await;
                        match JobOutcome::from_exit_code(retry_code) {
                            JobOutcome::Success => {
                                stats.record_success(&site.name);
                                info!(
                                    position,
                                    total,
                                    elapsed_secs = started.elapsed().as_secs(),
                                    "OK"
                                );
                            }
                            JobOutcome::Failure(code) => {
                                stats.record_failure(&site.name);
                                warn!(position, total, code, "FAIL");
                            }
                            JobOutcome::Interrupted => {
                                stats.record_failure(&site.name);
                                warn!(position, total, "retry interrupted, counted as failed");
                            }
                        }
                    }
                }
            }
        }

        if config.delay_between_urls_secs > 0 && position < total {
            debug!(delay_secs = config.delay_between_urls_secs, "inter-URL delay");
            let _ = sleep_interruptible(
                Duration::from_secs(config.delay_between_urls_secs),
                interrupt,
            )
            .await;
        }
    }

    let site_stats = stats.site(&site.name).unwrap_or_default();
    info!(
        ok = site_stats.ok,
        fail = site_stats.fail,
        attempted = site_stats.attempted,
        "site run finished"
    );
    SiteOutcome::Completed
}

/// Builds the per-site job runner for a batch.
///
/// A seam (rather than constructing [`crate::runner::ToolRunner`] directly)
/// so batch behavior is testable with scripted invokers.
pub type RunnerFactory<'a> = dyn Fn(&Site, &SiteConfig) -> Box<dyn JobInvoker> + Send + Sync + 'a;

/// Runs every runnable site in sequence, sharing one statistics aggregator.
///
/// Preflight excludes sites with empty lists or unresolvable hosts; an
/// excluded site never fails the batch. An Abort decision inside any site
/// stops intake of further sites immediately.
#[instrument(skip_all, fields(sites = sites.len()))]
pub async fn run_batch(
    sites: &[Site],
    settings: &SiteSettings,
    make_runner: &RunnerFactory<'_>,
    prompt: &dyn DecisionPrompt,
    interrupt: &InterruptFlag,
) -> RunStats {
    let mut stats = RunStats::new();

    for site in sites {
        let status = check_site(site).await;
        if !status.is_runnable() {
            warn!(site = %site.name, %status, "excluding site from batch");
            continue;
        }

        let config = settings.get(&site.name);
        let runner = make_runner(site, &config);
        let outcome = run_site(site, &config, runner.as_ref(), prompt, interrupt, &mut stats).await;
        if outcome == SiteOutcome::Aborted {
            info!(site = %site.name, "batch stopped by abort");
            break;
        }
    }

    stats
}
