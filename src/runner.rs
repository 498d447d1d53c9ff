//! Batch scheduler: strictly sequential batches, full concurrency inside each batch.
//!
//! For each batch, unless a stop was requested, every item is driven through the
//! [`RetryExecutor`] concurrently, its outcome is counted in the [`RunState`] and the item
//! callback is invoked once. The scheduler waits for the whole batch, then pauses for
//! `inter_batch_delay` (plus `[500ms, 1500ms)` of jitter when enabled) before the next one. The
//! pause is cancellation-aware and is skipped after the last batch.
//!
//! Items of one batch are polled on the caller's task. Callbacks therefore never run in
//! parallel with each other, and the processed count seen by successive callbacks strictly
//! increases.
//!
//! ```rust
//! use livesweep::{BatchRunner, CancelSignal, InstantSleeper, NullSink, RunConfig};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let config = RunConfig::builder().batch_size(2).max_retries(0).build().unwrap();
//! let runner = BatchRunner::builder()
//!     .config(config)
//!     .with_sleeper(InstantSleeper)
//!     .with_sink(NullSink)
//!     .build();
//!
//! let ids = ["alice", "bob", "carol"];
//! let probe = |id: String| async move { Ok::<_, std::io::Error>(id.len()) };
//! let summary = runner
//!     .run(&ids, &probe, |report| println!("{} {}", report.item, report.progress), &CancelSignal::new())
//!     .await;
//! assert_eq!(summary.progress.succeeded, 3);
//! assert_eq!(summary.batches, 2);
//! # });
//! ```

use crate::batch::{batch_count, batches};
use crate::progress::{Progress, RunState};
use crate::telemetry::{emit_best_effort, LogSink, RunEvent, TelemetrySink};
use crate::{
    Backoff, CancelSignal, Jitter, Outcome, Probe, RetryExecutor, RunConfig, Sleeper, TokioSleeper,
};
use futures::future::join_all;
use std::sync::Arc;

/// Delivered to the item callback exactly once per dispatched item.
#[derive(Debug)]
pub struct ItemReport<'a, T, E> {
    pub item: &'a str,
    pub outcome: Outcome<T, E>,
    /// Counters including this item.
    pub progress: Progress,
}

/// Result of a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub progress: Progress,
    /// Batches that were dispatched.
    pub batches: usize,
    /// A stop request prevented at least one item from resolving or being dispatched.
    pub stopped_early: bool,
}

/// Drives a list of identifiers through a probe in paced batches.
pub struct BatchRunner<S = LogSink> {
    config: RunConfig,
    executor: RetryExecutor<S>,
    batch_jitter: Jitter,
    sleeper: Arc<dyn Sleeper>,
    sink: S,
}

impl<S> std::fmt::Debug for BatchRunner<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchRunner")
            .field("config", &self.config)
            .field("executor", &self.executor)
            .field("batch_jitter", &self.batch_jitter)
            .field("sleeper", &self.sleeper)
            .finish()
    }
}

impl BatchRunner<LogSink> {
    /// Construct a new builder with defaults.
    pub fn builder() -> BatchRunnerBuilder<LogSink> {
        BatchRunnerBuilder::new()
    }
}

impl<S> BatchRunner<S>
where
    S: TelemetrySink + Sync,
    S::Future: Send + 'static,
{
    /// Configuration this runner was built with.
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run `items` to completion or until `cancel` fires.
    pub async fn run<I, P, F>(
        &self,
        items: &[I],
        probe: &P,
        on_item_done: F,
        cancel: &CancelSignal,
    ) -> RunSummary
    where
        I: AsRef<str> + Sync,
        P: Probe + ?Sized,
        F: Fn(ItemReport<'_, P::Output, P::Error>) + Send + Sync,
    {
        let state = RunState::new(items.len());
        self.run_with_state(items, probe, on_item_done, cancel, &state).await
    }

    /// Like [`run`](Self::run), counting into a caller-owned `state` that other threads may read.
    ///
    /// `state` should be fresh and sized with `items.len()`.
    pub async fn run_with_state<I, P, F>(
        &self,
        items: &[I],
        probe: &P,
        on_item_done: F,
        cancel: &CancelSignal,
        state: &RunState,
    ) -> RunSummary
    where
        I: AsRef<str> + Sync,
        P: Probe + ?Sized,
        F: Fn(ItemReport<'_, P::Output, P::Error>) + Send + Sync,
    {
        let total = items.len();
        let size = self.config.batch_size();
        let planned = batch_count(total, size);
        tracing::info!(total, batch_size = size.get(), batches = planned, "run starting");

        let on_item_done = &on_item_done;
        let mut dispatched = 0;
        for (index, batch) in batches(items, size).enumerate() {
            if cancel.is_cancelled() {
                break;
            }
            emit_best_effort(self.sink.clone(), RunEvent::BatchStarted { index, size: batch.len() })
                .await;

            let tasks = batch.iter().map(|item| async move {
                let item = item.as_ref();
                let outcome = self.executor.execute(item, probe, cancel).await;
                let progress = state.record(&outcome);
                on_item_done(ItemReport { item, outcome, progress });
            });
            join_all(tasks).await;
            dispatched += 1;

            if dispatched < planned && !cancel.is_cancelled() {
                self.pause(cancel).await;
            }
        }

        let progress = state.snapshot();
        let stopped_early = cancel.is_cancelled() && (dispatched < planned || progress.cancelled > 0);
        if stopped_early {
            emit_best_effort(
                self.sink.clone(),
                RunEvent::RunStopped { processed: progress.processed, total },
            )
            .await;
        }
        tracing::info!(%progress, batches = dispatched, stopped_early, "run finished");

        RunSummary { progress, batches: dispatched, stopped_early }
    }

    async fn pause(&self, cancel: &CancelSignal) {
        let base = self.config.inter_batch_delay();
        let delay = if self.config.jitter_enabled() { self.batch_jitter.apply(base) } else { base };
        if delay.is_zero() {
            return;
        }
        emit_best_effort(self.sink.clone(), RunEvent::BatchPause { delay }).await;
        cancel.sleep(self.sleeper.as_ref(), delay).await;
    }
}

/// Builder for [`BatchRunner`].
pub struct BatchRunnerBuilder<S> {
    config: RunConfig,
    backoff: Backoff,
    retry_jitter: Jitter,
    batch_jitter: Jitter,
    sleeper: Arc<dyn Sleeper>,
    sink: S,
}

impl BatchRunnerBuilder<LogSink> {
    /// Defaults: [`RunConfig::default`], 500ms exponential backoff, retry and batch jitter
    /// presets, tokio timers, events logged through `tracing`.
    pub fn new() -> Self {
        Self {
            config: RunConfig::default(),
            backoff: Backoff::default(),
            retry_jitter: Jitter::retry_default(),
            batch_jitter: Jitter::batch_default(),
            sleeper: Arc::new(TokioSleeper),
            sink: LogSink,
        }
    }
}

impl Default for BatchRunnerBuilder<LogSink> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> BatchRunnerBuilder<S>
where
    S: Clone,
{
    /// Batch size, pause, jitter switch and retry budget for the run.
    pub fn config(mut self, config: RunConfig) -> Self {
        self.config = config;
        self
    }

    /// Backoff between retries of one item.
    pub fn backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Jitter added to every retry backoff.
    pub fn retry_jitter(mut self, jitter: Jitter) -> Self {
        self.retry_jitter = jitter;
        self
    }

    /// Jitter added to the inter-batch pause when the config enables it.
    pub fn batch_jitter(mut self, jitter: Jitter) -> Self {
        self.batch_jitter = jitter;
        self
    }

    /// Timer used for both retry backoff and the pause between batches.
    pub fn with_sleeper<Z>(mut self, sleeper: Z) -> Self
    where
        Z: Sleeper + 'static,
    {
        self.sleeper = Arc::new(sleeper);
        self
    }

    /// Route all run events (retries, exhaustion, batches, stop) to `sink`.
    pub fn with_sink<S2>(self, sink: S2) -> BatchRunnerBuilder<S2> {
        BatchRunnerBuilder {
            config: self.config,
            backoff: self.backoff,
            retry_jitter: self.retry_jitter,
            batch_jitter: self.batch_jitter,
            sleeper: self.sleeper,
            sink,
        }
    }

    /// Build the runner. The executor inherits `max_retries` from the config and shares the
    /// sleeper and sink.
    pub fn build(self) -> BatchRunner<S> {
        let executor = RetryExecutor::builder()
            .max_retries(self.config.max_retries())
            .backoff(self.backoff)
            .with_jitter(self.retry_jitter)
            .with_shared_sleeper(self.sleeper.clone())
            .with_sink(self.sink.clone())
            .build();
        BatchRunner {
            config: self.config,
            executor,
            batch_jitter: self.batch_jitter,
            sleeper: self.sleeper,
            sink: self.sink,
        }
    }
}
