//! Cooperative interrupt signal.
//!
//! Ctrl+C does not tear the run down. A signal listener raises a shared
//! atomic flag; the orchestration loop consumes it at well-defined
//! checkpoints and asks the operator what to do. Single-writer-per-direction:
//! the listener only raises, the orchestrator owns clearing.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, warn};

/// Shared cancellation token raised by Ctrl+C.
///
/// Cloning is cheap and shares the underlying flag.
#[derive(Debug, Clone, Default)]
pub struct InterruptFlag {
    raised: Arc<AtomicBool>,
}

impl InterruptFlag {
    /// Creates a lowered flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the flag. Idempotent.
    pub fn raise(&self) {
        self.raised.store(true, Ordering::SeqCst);
    }

    /// Returns whether the flag is currently raised, without clearing it.
    ///
    /// Used inside wait/supervision loops that must react but leave the
    /// prompt decision to the orchestrator.
    #[must_use]
    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }

    /// Atomically clears the flag, returning whether it was raised.
    ///
    /// One raised flag yields exactly one `true` across all callers, so a
    /// single Ctrl+C produces a single prompt.
    #[must_use]
    pub fn take(&self) -> bool {
        self.raised.swap(false, Ordering::SeqCst)
    }
}

/// Spawns a background task that raises `flag` on every Ctrl+C.
///
/// The task runs for the lifetime of the process; repeated interrupts
/// re-raise the flag after the orchestrator has cleared it.
pub fn install_ctrl_c_listener(flag: InterruptFlag) {
    tokio::spawn(async move {
        loop {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    debug!("interrupt signal received");
                    flag.raise();
                }
                Err(error) => {
                    warn!(%error, "failed to listen for interrupt signal");
                    return;
                }
            }
        }
    });
}
