#![forbid(unsafe_code)]
#![cfg_attr(not(test), deny(clippy::all))]

//! # livesweep
//!
//! Batched, retrying, cancellable sweeps over long lists of identifiers.
//!
//! A sweep checks every identifier with a caller-supplied [`Probe`]. Identifiers are split into
//! fixed-size batches; batches run one after another while the items inside a batch run
//! concurrently. Each item gets its own retry budget with exponential backoff and jitter, and a
//! [`CancelSignal`] stops the whole sweep cooperatively, interrupting any pending wait.
//!
//! ## Features
//!
//! - **Exponential backoff** (`500ms * 2^attempt`) with uniform jitter
//! - **Paced batches** with an optional jittered pause between them
//! - **Cooperative cancellation** that interrupts backoff and pause waits
//! - **Progress counters** safe to read from other threads
//! - **Telemetry sinks** built on `tower::Service`
//!
//! ## Quick Start
//!
//! ```rust
//! use livesweep::{BatchRunner, CancelSignal, RunConfig};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = RunConfig::builder()
//!         .batch_size(25)
//!         .inter_batch_delay(Duration::from_millis(10))
//!         .max_retries(2)
//!         .build()
//!         .unwrap();
//!     let runner = BatchRunner::builder().config(config).build();
//!
//!     let ids = vec!["alice".to_string(), "bob".to_string()];
//!     let probe = |id: String| async move {
//!         // Your liveness check here
//!         Ok::<_, std::io::Error>(!id.is_empty())
//!     };
//!
//!     let summary = runner
//!         .run(&ids, &probe, |report| println!("{}", report.progress), &CancelSignal::new())
//!         .await;
//!     assert_eq!(summary.progress.processed, 2);
//! }
//! ```

pub mod backoff;
pub mod batch;
pub mod cancel;
pub mod config;
pub mod error;
pub mod executor;
pub mod jitter;
pub mod prelude;
pub mod probe;
pub mod progress;
pub mod runner;
pub mod sleeper;
pub mod telemetry;

// Re-exports
pub use backoff::{Backoff, BackoffError, MAX_BACKOFF};
pub use batch::{batch_count, batches};
pub use cancel::{CancelSignal, SleepOutcome};
#[cfg(feature = "serde")]
pub use config::RunSettings;
pub use config::{parse_items, RunConfig, RunConfigBuilder};
pub use error::ConfigError;
pub use executor::{Outcome, RetryExecutor, RetryExecutorBuilder};
pub use jitter::{Jitter, JitterError};
pub use probe::Probe;
pub use progress::{Progress, RunState, Tally};
pub use runner::{BatchRunner, BatchRunnerBuilder, ItemReport, RunSummary};
pub use sleeper::{InstantSleeper, Sleeper, TokioSleeper, TrackingSleeper};
pub use telemetry::{
    emit_best_effort, FnSink, LogSink, MemorySink, MulticastSink, NullSink, RunEvent,
    StreamingSink, TelemetrySink,
};
