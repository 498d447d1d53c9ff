use std::fmt;
use std::time::Duration;

#[cfg(feature = "telemetry-json")]
use serde_json::json;

/// Events emitted while a run is in progress.
///
/// `Display` renders the operator-facing log line for each event, e.g.
/// `[RETRY] alice attempt 1 - connection reset`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    /// An attempt failed and another one will follow after `delay`.
    Retry {
        item: String,
        /// The retry number (1-indexed)
        attempt: u32,
        /// Backoff plus jitter before the next attempt
        delay: Duration,
        error: String,
    },
    /// The last permitted attempt failed; the item is reported as a failure.
    Exhausted { item: String, retries: u32, error: String },
    /// The item stopped retrying because the run was cancelled.
    ItemCancelled { item: String, attempts: u32 },
    /// A batch is about to be dispatched.
    BatchStarted {
        /// Batch number (0-indexed)
        index: usize,
        size: usize,
    },
    /// Pause inserted before the next batch.
    BatchPause { delay: Duration },
    /// The run ended early because a stop was requested.
    RunStopped { processed: usize, total: usize },
}

impl RunEvent {
    /// Stable, machine-friendly event name.
    pub fn kind(&self) -> &'static str {
        match self {
            RunEvent::Retry { .. } => "retry",
            RunEvent::Exhausted { .. } => "retry_exhausted",
            RunEvent::ItemCancelled { .. } => "item_cancelled",
            RunEvent::BatchStarted { .. } => "batch_started",
            RunEvent::BatchPause { .. } => "batch_pause",
            RunEvent::RunStopped { .. } => "run_stopped",
        }
    }

    /// The identifier this event is about, if it concerns a single item.
    pub fn item(&self) -> Option<&str> {
        match self {
            RunEvent::Retry { item, .. }
            | RunEvent::Exhausted { item, .. }
            | RunEvent::ItemCancelled { item, .. } => Some(item),
            _ => None,
        }
    }

    #[cfg(feature = "telemetry-json")]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            RunEvent::Retry { item, attempt, delay, error } => json!({
                "kind": self.kind(),
                "item": item,
                "attempt": attempt,
                "delay_ms": millis_saturated(*delay),
                "error": error,
            }),
            RunEvent::Exhausted { item, retries, error } => json!({
                "kind": self.kind(),
                "item": item,
                "retries": retries,
                "error": error,
            }),
            RunEvent::ItemCancelled { item, attempts } => {
                json!({ "kind": self.kind(), "item": item, "attempts": attempts })
            }
            RunEvent::BatchStarted { index, size } => {
                json!({ "kind": self.kind(), "index": index, "size": size })
            }
            RunEvent::BatchPause { delay } => {
                json!({ "kind": self.kind(), "delay_ms": millis_saturated(*delay) })
            }
            RunEvent::RunStopped { processed, total } => {
                json!({ "kind": self.kind(), "processed": processed, "total": total })
            }
        }
    }
}

#[cfg(feature = "telemetry-json")]
fn millis_saturated(duration: Duration) -> u64 {
    duration.as_millis().try_into().unwrap_or(u64::MAX)
}

impl fmt::Display for RunEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunEvent::Retry { item, attempt, error, .. } => {
                write!(f, "[RETRY] {} attempt {} - {}", item, attempt, error)
            }
            RunEvent::Exhausted { item, retries, error } => {
                write!(f, "[ERROR] {} - after {} retries: {}", item, retries, error)
            }
            RunEvent::ItemCancelled { item, attempts } => {
                write!(f, "[STOP] {} - stopped after {} attempt(s)", item, attempts)
            }
            RunEvent::BatchStarted { index, size } => {
                write!(f, "[BATCH] #{} ({} items)", index + 1, size)
            }
            RunEvent::BatchPause { delay } => write!(f, "[WAIT] {:?} before next batch", delay),
            RunEvent::RunStopped { processed, total } => {
                write!(f, "[STOP] run stopped by request ({}/{} processed)", processed, total)
            }
        }
    }
}
