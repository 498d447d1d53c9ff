//! Cooperative, run-scoped cancellation.
//!
//! A [`CancelSignal`] is created per run and handed to every suspension point. Setting it never
//! aborts an in-flight probe; work stops at the next backoff sleep, the next inter-batch pause,
//! or before the next batch is dispatched.

use crate::Sleeper;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// How a cancellation-aware sleep ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepOutcome {
    /// The full duration elapsed.
    Elapsed,
    /// The signal fired first; the remainder of the sleep was abandoned.
    Interrupted,
}

/// Cloneable stop handle shared by the driver and all in-flight work of one run.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    token: CancellationToken,
    fired: Arc<AtomicBool>,
}

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop. Idempotent; returns `true` only for the call that set the signal.
    pub fn cancel(&self) -> bool {
        let first = !self.fired.swap(true, Ordering::SeqCst);
        if first {
            tracing::info!("stop requested; in-flight items finish at their next suspension point");
        }
        self.token.cancel();
        first
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the signal has been set.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// Sleep for `duration` unless the signal fires first.
    pub async fn sleep(&self, sleeper: &dyn Sleeper, duration: Duration) -> SleepOutcome {
        if self.is_cancelled() {
            return SleepOutcome::Interrupted;
        }
        tokio::select! {
            biased;
            _ = self.token.cancelled() => SleepOutcome::Interrupted,
            _ = sleeper.sleep(duration) => SleepOutcome::Elapsed,
        }
    }
}
