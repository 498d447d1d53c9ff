//! Shared run counters and progress snapshots.
//!
//! [`RunState`] is the only mutable state shared by concurrently completing items. All updates
//! are atomic, so a driver may hold an `Arc<RunState>` and read it from another thread while the
//! run is in flight.

use crate::Outcome;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Counters for one run.
#[derive(Debug)]
pub struct RunState {
    total: usize,
    processed: AtomicUsize,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
    cancelled: AtomicUsize,
}

impl RunState {
    /// Fresh counters for a run over `total` items.
    pub fn new(total: usize) -> Self {
        Self {
            total,
            processed: AtomicUsize::new(0),
            succeeded: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            cancelled: AtomicUsize::new(0),
        }
    }

    /// Number of items the run was started with.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Count one successful item. Returns a snapshot that includes it.
    pub fn record_success(&self) -> Progress {
        self.bump(&self.succeeded)
    }

    /// Count one item whose retries ran out.
    pub fn record_failure(&self) -> Progress {
        self.bump(&self.failed)
    }

    /// Count one item that a stop request ended before it resolved.
    pub fn record_cancelled(&self) -> Progress {
        self.bump(&self.cancelled)
    }

    /// Count one terminal outcome. Returns the snapshot that includes it.
    pub fn record<T, E>(&self, outcome: &Outcome<T, E>) -> Progress {
        match outcome {
            Outcome::Success { .. } => self.record_success(),
            Outcome::Failure { .. } => self.record_failure(),
            Outcome::Cancelled { .. } => self.record_cancelled(),
        }
    }

    /// Current counters. `succeeded + failed + cancelled <= processed` holds for every snapshot,
    /// even while other threads are recording.
    pub fn snapshot(&self) -> Progress {
        // Outcome counters first: writers bump `processed` before them.
        let succeeded = self.succeeded.load(Ordering::SeqCst);
        let failed = self.failed.load(Ordering::SeqCst);
        let cancelled = self.cancelled.load(Ordering::SeqCst);
        Progress {
            total: self.total,
            processed: self.processed.load(Ordering::SeqCst),
            succeeded,
            failed,
            cancelled,
        }
    }

    fn bump(&self, outcome: &AtomicUsize) -> Progress {
        self.processed.fetch_add(1, Ordering::SeqCst);
        outcome.fetch_add(1, Ordering::SeqCst);
        self.snapshot()
    }
}

/// Point-in-time view of a run's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
    pub total: usize,
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl Progress {
    /// `round(processed / total * 100)` clamped to `0..=100`; `0` for an empty run.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        let pct = (self.processed as f64 / self.total as f64 * 100.0).round();
        pct.clamp(0.0, 100.0) as u8
    }

    /// Every item has been counted.
    pub fn is_complete(&self) -> bool {
        self.processed >= self.total
    }

    /// Items not yet counted.
    pub fn remaining(&self) -> usize {
        self.total.saturating_sub(self.processed)
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "processed {}/{} ({}%) | ok {} | failed {} | cancelled {}",
            self.processed,
            self.total,
            self.percent(),
            self.succeeded,
            self.failed,
            self.cancelled
        )
    }
}

/// Counts resolved items by the value their probe returned.
///
/// The engine only knows success and failure; what a success *means* (live, dead, parked...) is
/// the probe's `Output`. Feeding every [`Outcome`] through a tally gives the per-verdict status
/// line, e.g. `LIVE: 12 | DEAD: 3 | ERROR: 1`.
#[derive(Debug)]
pub struct Tally<K> {
    counts: Mutex<BTreeMap<K, usize>>,
    errors: AtomicUsize,
    cancelled: AtomicUsize,
}

impl<K: Ord + Clone> Tally<K> {
    pub fn new() -> Self {
        Self::with_keys(std::iter::empty())
    }

    /// Pre-register verdicts so they are reported even while their count is zero.
    pub fn with_keys<I>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
    {
        Self {
            counts: Mutex::new(keys.into_iter().map(|key| (key, 0)).collect()),
            errors: AtomicUsize::new(0),
            cancelled: AtomicUsize::new(0),
        }
    }

    /// Count one outcome under its verdict, as an error, or as stopped.
    pub fn record<E>(&self, outcome: &Outcome<K, E>) {
        match outcome {
            Outcome::Success { value, .. } => {
                *self.lock().entry(value.clone()).or_insert(0) += 1;
            }
            Outcome::Failure { .. } => {
                self.errors.fetch_add(1, Ordering::SeqCst);
            }
            Outcome::Cancelled { .. } => {
                self.cancelled.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    /// Successes that returned `key`.
    pub fn count(&self, key: &K) -> usize {
        self.lock().get(key).copied().unwrap_or(0)
    }

    /// Items whose retries ran out.
    pub fn errors(&self) -> usize {
        self.errors.load(Ordering::SeqCst)
    }

    /// Items a stop request ended before they resolved.
    pub fn cancelled(&self) -> usize {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Per-verdict counts in key order.
    pub fn counts(&self) -> Vec<(K, usize)> {
        self.lock().iter().map(|(key, n)| (key.clone(), *n)).collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<K, usize>> {
        self.counts.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<K: Ord + Clone> Default for Tally<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + Clone + fmt::Display> fmt::Display for Tally<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, n) in self.counts() {
            write!(f, "{}: {} | ", key, n)?;
        }
        write!(f, "ERROR: {}", self.errors())?;
        match self.cancelled() {
            0 => Ok(()),
            n => write!(f, " | STOPPED: {}", n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn percent_rounds_and_clamps() {
        let p = |processed, total| Progress { processed, total, ..Progress::default() };
        assert_eq!(p(0, 0).percent(), 0);
        assert_eq!(p(0, 10).percent(), 0);
        assert_eq!(p(1, 3).percent(), 33);
        assert_eq!(p(2, 3).percent(), 67);
        assert_eq!(p(1, 8).percent(), 13); // 12.5 rounds up
        assert_eq!(p(10, 10).percent(), 100);
        assert_eq!(p(12, 10).percent(), 100);
    }

    #[test]
    fn record_counts_each_outcome_once() {
        let state = RunState::new(3);
        let ok: Outcome<(), std::io::Error> = Outcome::Success { value: (), attempts: 1 };
        let failed: Outcome<(), std::io::Error> =
            Outcome::Failure { error: std::io::Error::other("x"), attempts: 2 };
        let cancelled: Outcome<(), std::io::Error> =
            Outcome::Cancelled { last_error: None, attempts: 0 };

        assert_eq!(state.record(&ok).processed, 1);
        assert_eq!(state.record(&failed).processed, 2);
        let last = state.record(&cancelled);

        assert_eq!(last, Progress { total: 3, processed: 3, succeeded: 1, failed: 1, cancelled: 1 });
        assert!(last.is_complete());
        assert_eq!(last.remaining(), 0);
        assert_eq!(state.snapshot(), last);
    }

    #[test]
    fn concurrent_increments_are_not_lost() {
        let state = Arc::new(RunState::new(8_000));
        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let state = state.clone();
                std::thread::spawn(move || {
                    for _ in 0..1_000 {
                        if worker % 2 == 0 {
                            state.record_success();
                        } else {
                            state.record_failure();
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = state.snapshot();
        assert_eq!(snapshot.processed, 8_000);
        assert_eq!(snapshot.succeeded, 4_000);
        assert_eq!(snapshot.failed, 4_000);
        assert_eq!(snapshot.percent(), 100);
    }

    #[test]
    fn readers_never_see_more_outcomes_than_processed() {
        let state = Arc::new(RunState::new(30_000));
        let writers: Vec<_> = (0..3)
            .map(|worker| {
                let state = state.clone();
                std::thread::spawn(move || {
                    for _ in 0..10_000 {
                        match worker {
                            0 => state.record_success(),
                            1 => state.record_failure(),
                            _ => state.record_cancelled(),
                        };
                    }
                })
            })
            .collect();

        let reader = {
            let state = state.clone();
            std::thread::spawn(move || loop {
                let p = state.snapshot();
                assert!(p.succeeded + p.failed + p.cancelled <= p.processed, "{:?}", p);
                if p.processed == 30_000 {
                    break;
                }
                std::thread::sleep(Duration::from_micros(10));
            })
        };

        for writer in writers {
            writer.join().unwrap();
        }
        reader.join().unwrap();
        assert_eq!(state.snapshot().cancelled, 10_000);
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
    enum Verdict {
        Live,
        Dead,
    }

    impl fmt::Display for Verdict {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(match self {
                Verdict::Live => "LIVE",
                Verdict::Dead => "DEAD",
            })
        }
    }

    #[test]
    fn tally_splits_successes_by_value() {
        let tally = Tally::with_keys([Verdict::Live, Verdict::Dead]);
        assert_eq!(tally.to_string(), "LIVE: 0 | DEAD: 0 | ERROR: 0");

        let live: Outcome<Verdict, std::io::Error> = Outcome::Success { value: Verdict::Live, attempts: 1 };
        let dead: Outcome<Verdict, std::io::Error> = Outcome::Success { value: Verdict::Dead, attempts: 2 };
        let error: Outcome<Verdict, std::io::Error> =
            Outcome::Failure { error: std::io::Error::other("x"), attempts: 4 };
        tally.record(&live);
        tally.record(&live);
        tally.record(&dead);
        tally.record(&error);

        assert_eq!(tally.count(&Verdict::Live), 2);
        assert_eq!(tally.errors(), 1);
        assert_eq!(tally.counts(), vec![(Verdict::Live, 2), (Verdict::Dead, 1)]);
        assert_eq!(tally.to_string(), "LIVE: 2 | DEAD: 1 | ERROR: 1");

        tally.record(&Outcome::<Verdict, std::io::Error>::Cancelled { last_error: None, attempts: 0 });
        assert_eq!(tally.to_string(), "LIVE: 2 | DEAD: 1 | ERROR: 1 | STOPPED: 1");
    }

    #[test]
    fn display_summarises_counts() {
        let progress = Progress { total: 10, processed: 3, succeeded: 2, failed: 1, cancelled: 0 };
        assert_eq!(progress.to_string(), "processed 3/10 (30%) | ok 2 | failed 1 | cancelled 0");
    }
}
