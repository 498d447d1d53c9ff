//! Runs one item through a [`Probe`] with bounded, jittered, cancellable retries.
//!
//! Semantics:
//! - `max_retries` counts retries after the initial attempt, so an item gets at most
//!   `max_retries + 1` attempts.
//! - Every failure that will be followed by another attempt emits [`RunEvent::Retry`] and sleeps
//!   for `backoff.delay(n) + jitter`. The final failure does not sleep.
//! - Running out of attempts emits [`RunEvent::Exhausted`] and yields [`Outcome::Failure`]
//!   carrying the last error.
//! - Cancellation is checked before every attempt and interrupts the backoff sleep. The item then
//!   yields [`Outcome::Cancelled`] and emits [`RunEvent::ItemCancelled`]; it is neither a success
//!   nor a failure.
//!
//! Invariants:
//! - Exactly one `Outcome` per call.
//! - For an always-failing probe and no cancellation: `max_retries` retry events, one exhaustion
//!   event, `max_retries + 1` probe calls.
//!
//! Example
//! ```rust
//! use livesweep::{CancelSignal, InstantSleeper, NullSink, Outcome, RetryExecutor};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let executor = RetryExecutor::builder()
//!     .max_retries(2)
//!     .with_sleeper(InstantSleeper)
//!     .with_sink(NullSink)
//!     .build();
//! let probe = |_id: String| async { Err::<(), _>(std::io::Error::other("down")) };
//! let outcome = executor.execute("alice", &probe, &CancelSignal::new()).await;
//! assert!(matches!(outcome, Outcome::Failure { attempts: 3, .. }));
//! # });
//! ```

use crate::telemetry::{emit_best_effort, LogSink, RunEvent, TelemetrySink};
use crate::{Backoff, CancelSignal, Jitter, Probe, Sleeper, TokioSleeper};
use std::sync::Arc;

/// Terminal result of one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T, E> {
    /// An attempt succeeded; no further attempts were made.
    Success { value: T, attempts: u32 },
    /// Every permitted attempt failed.
    Failure { error: E, attempts: u32 },
    /// The run was cancelled before the item resolved.
    Cancelled { last_error: Option<E>, attempts: u32 },
}

impl<T, E> Outcome<T, E> {
    /// `true` if an attempt succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    /// `true` if every permitted attempt failed.
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure { .. })
    }

    /// `true` if a stop request ended the item before it resolved.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Outcome::Cancelled { .. })
    }

    /// Number of probe calls made for this item.
    pub fn attempts(&self) -> u32 {
        match self {
            Outcome::Success { attempts, .. }
            | Outcome::Failure { attempts, .. }
            | Outcome::Cancelled { attempts, .. } => *attempts,
        }
    }

    /// The probe's value on success.
    pub fn value(&self) -> Option<&T> {
        match self {
            Outcome::Success { value, .. } => Some(value),
            _ => None,
        }
    }

    /// The most recent error, if any attempt failed and none succeeded.
    pub fn error(&self) -> Option<&E> {
        match self {
            Outcome::Failure { error, .. } => Some(error),
            Outcome::Cancelled { last_error, .. } => last_error.as_ref(),
            Outcome::Success { .. } => None,
        }
    }
}

/// Retry driver for a single item.
#[derive(Clone)]
pub struct RetryExecutor<S = LogSink> {
    max_retries: u32,
    backoff: Backoff,
    jitter: Jitter,
    sleeper: Arc<dyn Sleeper>,
    sink: S,
}

impl<S> std::fmt::Debug for RetryExecutor<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryExecutor")
            .field("max_retries", &self.max_retries)
            .field("backoff", &self.backoff)
            .field("jitter", &self.jitter)
            .field("sleeper", &self.sleeper)
            .field("sink", &"<sink>")
            .finish()
    }
}

impl RetryExecutor<LogSink> {
    /// Construct a new builder with defaults.
    pub fn builder() -> RetryExecutorBuilder<LogSink> {
        RetryExecutorBuilder::new()
    }
}

impl<S> RetryExecutor<S>
where
    S: TelemetrySink + Sync,
    S::Future: Send + 'static,
{
    /// Retries allowed after the initial attempt.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Drive `item` to an [`Outcome`].
    pub async fn execute<P>(
        &self,
        item: &str,
        probe: &P,
        cancel: &CancelSignal,
    ) -> Outcome<P::Output, P::Error>
    where
        P: Probe + ?Sized,
    {
        let mut failed: u32 = 0;
        let mut last_error = None;

        while failed <= self.max_retries && !cancel.is_cancelled() {
            match probe.probe(item).await {
                Ok(value) => {
                    tracing::debug!(item, attempts = failed + 1, "probe succeeded");
                    return Outcome::Success { value, attempts: failed + 1 };
                }
                Err(error) => {
                    failed += 1;
                    if failed > self.max_retries {
                        last_error = Some(error);
                        break;
                    }

                    let delay = self.jitter.apply(self.backoff.delay(failed));
                    tracing::debug!(item, attempt = failed, ?delay, %error, "probe failed; backing off");
                    let event = RunEvent::Retry {
                        item: item.to_owned(),
                        attempt: failed,
                        delay,
                        error: error.to_string(),
                    };
                    emit_best_effort(self.sink.clone(), event).await;
                    last_error = Some(error);

                    cancel.sleep(self.sleeper.as_ref(), delay).await;
                }
            }
        }

        match last_error {
            Some(error) if failed > self.max_retries => {
                let event = RunEvent::Exhausted {
                    item: item.to_owned(),
                    retries: self.max_retries,
                    error: error.to_string(),
                };
                emit_best_effort(self.sink.clone(), event).await;
                Outcome::Failure { error, attempts: failed }
            }
            last_error => {
                let event = RunEvent::ItemCancelled { item: item.to_owned(), attempts: failed };
                emit_best_effort(self.sink.clone(), event).await;
                Outcome::Cancelled { last_error, attempts: failed }
            }
        }
    }
}

/// Builder for `RetryExecutor`.
pub struct RetryExecutorBuilder<S> {
    max_retries: u32,
    backoff: Backoff,
    jitter: Jitter,
    sleeper: Arc<dyn Sleeper>,
    sink: S,
}

impl RetryExecutorBuilder<LogSink> {
    /// Defaults: 3 retries, 500ms exponential backoff, `[0, 500ms)` jitter, tokio timers,
    /// events logged through `tracing`.
    pub fn new() -> Self {
        Self {
            max_retries: 3,
            backoff: Backoff::default(),
            jitter: Jitter::retry_default(),
            sleeper: Arc::new(TokioSleeper),
            sink: LogSink,
        }
    }
}

impl Default for RetryExecutorBuilder<LogSink> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> RetryExecutorBuilder<S> {
    /// Retries after the initial attempt. `0` means a single attempt.
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the backoff strategy applied before each retry.
    pub fn backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Set the jitter added on top of every backoff delay.
    pub fn with_jitter(mut self, jitter: Jitter) -> Self {
        self.jitter = jitter;
        self
    }

    /// Use a custom sleeper (e.g. `InstantSleeper` or `TrackingSleeper` in tests).
    pub fn with_sleeper<Z>(mut self, sleeper: Z) -> Self
    where
        Z: Sleeper + 'static,
    {
        self.sleeper = Arc::new(sleeper);
        self
    }

    /// Share the runner's sleeper so batch pauses and retries use the same timer.
    pub(crate) fn with_shared_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Route retry, exhaustion and cancellation events to `sink`.
    pub fn with_sink<S2>(self, sink: S2) -> RetryExecutorBuilder<S2> {
        RetryExecutorBuilder {
            max_retries: self.max_retries,
            backoff: self.backoff,
            jitter: self.jitter,
            sleeper: self.sleeper,
            sink,
        }
    }

    /// Build the executor.
    pub fn build(self) -> RetryExecutor<S> {
        RetryExecutor {
            max_retries: self.max_retries,
            backoff: self.backoff,
            jitter: self.jitter,
            sleeper: self.sleeper,
            sink: self.sink,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::MemorySink;
    use crate::{InstantSleeper, TokioSleeper, TrackingSleeper};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
    #[error("TestError: {0}")]
    struct TestError(String);

    fn executor(max_retries: u32, sink: MemorySink) -> RetryExecutor<MemorySink> {
        RetryExecutor::builder()
            .max_retries(max_retries)
            .with_sleeper(InstantSleeper)
            .with_sink(sink)
            .build()
    }

    /// Probe failing `failures` times before succeeding; counts calls.
    fn flaky(failures: u32, calls: Arc<AtomicU32>) -> impl Probe<Output = u32, Error = TestError> {
        move |_id: String| {
            let calls = calls.clone();
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < failures {
                    Err(TestError(format!("attempt {}", n)))
                } else {
                    Ok(n + 1)
                }
            }
        }
    }

    #[tokio::test]
    async fn success_first_attempt() {
        let sink = MemorySink::new();
        let calls = Arc::new(AtomicU32::new(0));

        let outcome =
            executor(3, sink.clone()).execute("a", &flaky(0, calls.clone()), &CancelSignal::new()).await;

        assert_eq!(outcome, Outcome::Success { value: 1, attempts: 1 });
        assert_eq!(calls.load(Ordering::SeqCst), 1, "Should only execute once");
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn success_after_retries_emits_k_minus_one_retry_events() {
        let sink = MemorySink::new();
        let calls = Arc::new(AtomicU32::new(0));

        let outcome =
            executor(5, sink.clone()).execute("a", &flaky(2, calls.clone()), &CancelSignal::new()).await;

        assert_eq!(outcome, Outcome::Success { value: 3, attempts: 3 });
        assert_eq!(sink.count_kind("retry"), 2);
        assert_eq!(sink.count_kind("retry_exhausted"), 0);
    }

    #[tokio::test]
    async fn exhaustion_reports_last_error() {
        for retries in 0..5 {
            let sink = MemorySink::new();
            let calls = Arc::new(AtomicU32::new(0));

            let outcome = executor(retries, sink.clone())
                .execute("a", &flaky(u32::MAX, calls.clone()), &CancelSignal::new())
                .await;

            assert_eq!(calls.load(Ordering::SeqCst), retries + 1);
            assert_eq!(sink.count_kind("retry"), retries as usize);
            assert_eq!(sink.count_kind("retry_exhausted"), 1);
            match outcome {
                Outcome::Failure { error, attempts } => {
                    assert_eq!(attempts, retries + 1);
                    assert_eq!(error, TestError(format!("attempt {}", retries)));
                }
                other => panic!("expected failure, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn retry_events_carry_attempt_numbers() {
        let sink = MemorySink::new();
        let calls = Arc::new(AtomicU32::new(0));

        let _ = executor(2, sink.clone())
            .execute("bob", &flaky(u32::MAX, calls), &CancelSignal::new())
            .await;

        let events = sink.events();
        let attempts: Vec<u32> = events
            .iter()
            .filter_map(|e| match e {
                RunEvent::Retry { attempt, item, .. } => {
                    assert_eq!(item, "bob");
                    Some(*attempt)
                }
                _ => None,
            })
            .collect();
        assert_eq!(attempts, vec![1, 2]);
        assert_eq!(
            events.last(),
            Some(&RunEvent::Exhausted {
                item: "bob".into(),
                retries: 2,
                error: "TestError: attempt 2".into()
            })
        );
    }

    #[tokio::test]
    async fn backoff_applied_between_attempts_only() {
        let sleeper = TrackingSleeper::new();
        let executor = RetryExecutor::builder()
            .max_retries(3)
            .with_jitter(Jitter::None)
            .with_sleeper(sleeper.clone())
            .with_sink(MemorySink::new())
            .build();

        let calls = Arc::new(AtomicU32::new(0));
        let _ = executor.execute("a", &flaky(u32::MAX, calls), &CancelSignal::new()).await;

        // 4 attempts, 3 sleeps: 500ms * 2^n
        assert_eq!(
            sleeper.calls(),
            vec![Duration::from_millis(1000), Duration::from_millis(2000), Duration::from_millis(4000)]
        );
    }

    #[tokio::test]
    async fn jitter_applied_on_top_of_backoff() {
        let sleeper = TrackingSleeper::new();
        let executor = RetryExecutor::builder()
            .max_retries(2)
            .with_sleeper(sleeper.clone())
            .with_sink(MemorySink::new())
            .build();

        let calls = Arc::new(AtomicU32::new(0));
        let _ = executor.execute("a", &flaky(u32::MAX, calls), &CancelSignal::new()).await;

        let delays = sleeper.calls();
        assert_eq!(delays.len(), 2);
        for (idx, delay) in delays.iter().enumerate() {
            let base = Backoff::default().delay(idx as u32 + 1);
            assert!(*delay >= base);
            assert!(*delay < base + Duration::from_millis(500));
        }
    }

    #[tokio::test]
    async fn cancelled_before_start_never_probes() {
        let sink = MemorySink::new();
        let calls = Arc::new(AtomicU32::new(0));
        let cancel = CancelSignal::new();
        cancel.cancel();

        let outcome = executor(3, sink.clone()).execute("a", &flaky(0, calls.clone()), &cancel).await;

        assert_eq!(outcome, Outcome::Cancelled { last_error: None, attempts: 0 });
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(sink.count_kind("item_cancelled"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_backoff() {
        let sink = MemorySink::new();
        let executor = RetryExecutor::builder()
            .max_retries(10)
            .backoff(Backoff::exponential(Duration::from_secs(60)))
            .with_sleeper(TokioSleeper)
            .with_sink(sink.clone())
            .build();

        let cancel = CancelSignal::new();
        let stopper = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            stopper.cancel();
        });

        let calls = Arc::new(AtomicU32::new(0));
        let start = tokio::time::Instant::now();
        let outcome = executor.execute("a", &flaky(u32::MAX, calls.clone()), &cancel).await;

        assert!(start.elapsed() < Duration::from_secs(60));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(outcome.is_cancelled());
        assert_eq!(outcome.attempts(), 1);
        assert_eq!(outcome.error(), Some(&TestError("attempt 0".into())));
        assert_eq!(sink.count_kind("retry_exhausted"), 0);
        assert_eq!(sink.count_kind("item_cancelled"), 1);
    }

    #[test]
    fn outcome_accessors() {
        let ok: Outcome<u8, TestError> = Outcome::Success { value: 7, attempts: 2 };
        assert!(ok.is_success());
        assert_eq!(ok.value(), Some(&7));
        assert_eq!(ok.error(), None);

        let failed: Outcome<u8, TestError> =
            Outcome::Failure { error: TestError("x".into()), attempts: 4 };
        assert!(failed.is_failure());
        assert_eq!(failed.attempts(), 4);
        assert_eq!(failed.value(), None);
    }
}
