//! Exponential backoff between retry attempts of a single item.
//!
//! Attempt semantics: retries are numbered from `1`; the initial call never sleeps, so the
//! executor only asks for `delay(n)` with `n >= 1`. The delay for retry `n` is `base * 2^n`, so
//! with the default 500ms base the first retry waits 1s, the second 2s, and so on. Jitter is
//! layered on top by the executor (see [`crate::Jitter`]).
//!
//! Example
//! ```rust
//! use std::time::Duration;
//! use livesweep::Backoff;
//!
//! let backoff = Backoff::exponential(Duration::from_millis(500))
//!     .with_max(Duration::from_secs(5))
//!     .unwrap();
//! assert_eq!(backoff.delay(1), Duration::from_secs(1));
//! assert_eq!(backoff.delay(2), Duration::from_secs(2));
//! assert_eq!(backoff.delay(6), Duration::from_secs(5)); // capped
//! ```
//!
//! Overflow behavior: computations that would overflow saturate to `MAX_BACKOFF` (1 day).

use std::time::Duration;

/// Maximum delay used when calculations overflow (1 day).
pub const MAX_BACKOFF: Duration = Duration::from_secs(24 * 60 * 60);

/// Base delay used by [`Backoff::default`].
pub const DEFAULT_BASE: Duration = Duration::from_millis(500);

/// Errors returned by backoff configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackoffError {
    #[error("max must be greater than zero")]
    MaxMustBePositive,
    #[error("max ({max:?}) must be >= base ({base:?})")]
    MaxLessThanBase { base: Duration, max: Duration },
}

/// Exponential backoff: `base * 2^attempt`, optionally capped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    base: Duration,
    max: Option<Duration>,
}

impl Backoff {
    /// Create an exponential backoff strategy.
    pub fn exponential(base: Duration) -> Self {
        Self { base, max: None }
    }

    /// Cap every delay at `max`. Rejects a zero cap or one below `base`.
    pub fn with_max(mut self, max: Duration) -> Result<Self, BackoffError> {
        if max.is_zero() {
            return Err(BackoffError::MaxMustBePositive);
        }
        if max < self.base {
            return Err(BackoffError::MaxLessThanBase { base: self.base, max });
        }
        self.max = Some(max);
        Ok(self)
    }

    pub fn base(&self) -> Duration {
        self.base
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let multiplier = 2u128.saturating_pow(attempt);
        let nanos = self.base.as_nanos().saturating_mul(multiplier);
        let exp_delay = Duration::from_nanos(nanos.min(MAX_BACKOFF.as_nanos()) as u64);
        let capped = self.max.map(|m| exp_delay.min(m)).unwrap_or(exp_delay);
        capped.min(MAX_BACKOFF)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::exponential(DEFAULT_BASE)
    }
}
