//! Per-site pacing policy.
//!
//! Two delays shape a site run: a randomized sleep before each URL attempt
//! (`base ± jitter`) and a fixed delay between consecutive URLs. Both exist
//! to keep request rates polite toward the remote host; both must yield to a
//! pending interrupt instead of running to completion blindly.

use std::time::Duration;

use rand::Rng;
use tracing::debug;

use crate::interrupt::InterruptFlag;

/// Granularity at which a waiting sleep re-checks the interrupt flag.
///
/// A cancellation request takes effect within roughly this window.
const SLEEP_CHECK_INTERVAL: Duration = Duration::from_millis(100);

/// How a paced wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepOutcome {
    /// The full duration elapsed.
    Completed,
    /// The interrupt flag was raised during the wait; remaining time skipped.
    Interrupted,
}

/// Computes the randomized pre-attempt sleep.
///
/// Returns zero when `base_secs` is zero (pacing disabled). Otherwise samples
/// uniformly from `[max(0, base - jitter), base + jitter]`; a jitter larger
/// than the base clamps the lower bound at zero.
#[must_use]
pub fn compute_sleep(base_secs: u64, jitter_secs: f64) -> Duration {
    if base_secs == 0 {
        return Duration::ZERO;
    }
    let base = base_secs as f64;
    let jitter = jitter_secs.max(0.0);
    let low = (base - jitter).max(0.0);
    let high = base + jitter;
    let sampled = if high > low {
        rand::thread_rng().gen_range(low..=high)
    } else {
        low
    };
    Duration::from_secs_f64(sampled)
}

/// Sleeps for `total`, waking early if `interrupt` is raised.
///
/// Checks the flag at [`SLEEP_CHECK_INTERVAL`] granularity but does not
/// clear it; consuming the flag (and prompting the operator) stays with the
/// orchestration loop's checkpoints.
pub async fn sleep_interruptible(total: Duration, interrupt: &InterruptFlag) -> SleepOutcome {
    if total.is_zero() {
        return SleepOutcome::Completed;
    }
    if interrupt.is_raised() {
        debug!("skipping sleep, interrupt already pending");
        return SleepOutcome::Interrupted;
    }

    let mut remaining = total;
    while !remaining.is_zero() {
        let chunk = remaining.min(SLEEP_CHECK_INTERVAL);
        tokio::time::sleep(chunk).await;
        if interrupt.is_raised() {
            debug!(remaining_ms = remaining.as_millis() as u64, "sleep interrupted");
            return SleepOutcome::Interrupted;
        }
        remaining = remaining.saturating_sub(chunk);
    }
    SleepOutcome::Completed
}
