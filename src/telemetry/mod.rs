//! Run telemetry and the log-sink seam.
//!
//! The executor and runner describe what they do as [`RunEvent`]s. Events flow through
//! `TelemetrySink` implementations which can log, collect, broadcast or forward them. Emission
//! is best-effort: a failing sink never affects an item's outcome.
//!
//! - **Per item**: `Retry`, `Exhausted`, `ItemCancelled`
//! - **Per batch**: `BatchStarted`, `BatchPause`
//! - **Per run**: `RunStopped`

pub mod events;
pub mod sinks;

pub use events::RunEvent;
pub use sinks::{
    emit_best_effort, ComposedSinkError, FnSink, LogSink, MemorySink, MulticastSink, NullSink,
    StreamingSink, TelemetrySink,
};
