//! Convenient re-exports for common livesweep types.
pub use crate::{
    backoff::{Backoff, BackoffError, MAX_BACKOFF},
    cancel::{CancelSignal, SleepOutcome},
    config::{parse_items, RunConfig},
    executor::{Outcome, RetryExecutor},
    jitter::Jitter,
    probe::Probe,
    progress::{Progress, RunState, Tally},
    runner::{BatchRunner, ItemReport, RunSummary},
    telemetry::{LogSink, MemorySink, NullSink, RunEvent, TelemetrySink},
    ConfigError,
};
