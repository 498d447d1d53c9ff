//! Additive jitter to desynchronise delays across concurrently retrying items.
//!
//! - `None`: deterministic delays for tests or tightly controlled workflows.
//! - `Uniform`: adds a sample drawn uniformly from the half-open range `[low, high)`.
//!
//! Two presets cover the engine's needs: [`Jitter::retry_default`] (`[0, 500ms)`, added to each
//! retry backoff) and [`Jitter::batch_default`] (`[500ms, 1500ms)`, added to the pause between
//! batches when jitter is enabled).
//!
//! RNG: uses `rand`'s thread-local RNG by default; deterministic RNGs can be injected via
//! `apply_with_rng`. The thread-local generator is created and dropped inside `apply`, so it is
//! never held across an `.await`.
//!
//! Example:
//! ```rust
//! use livesweep::Jitter;
//! use std::time::Duration;
//!
//! let jitter = Jitter::retry_default();
//! let delay = jitter.apply(Duration::from_secs(1));
//! assert!(delay >= Duration::from_secs(1));
//! assert!(delay < Duration::from_millis(1500));
//! ```

use rand::{rng, Rng};
use std::time::Duration;

/// Rejected jitter bounds.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("jitter low bound ({low:?}) must not exceed high bound ({high:?})")]
pub struct JitterError {
    pub low: Duration,
    pub high: Duration,
}

/// Jitter strategy added on top of a base delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Jitter {
    /// No jitter - use exact delay
    #[default]
    None,
    /// Uniform sample in `[low, high)` added to the delay
    Uniform { low: Duration, high: Duration },
}

impl Jitter {
    /// Uniform jitter in `[low, high)`. `low == high` always adds exactly `low`.
    pub fn uniform(low: Duration, high: Duration) -> Result<Self, JitterError> {
        if low > high {
            return Err(JitterError { low, high });
        }
        Ok(Jitter::Uniform { low, high })
    }

    /// `[0, 500ms)`, the spread added to every retry backoff.
    pub fn retry_default() -> Self {
        Jitter::Uniform { low: Duration::ZERO, high: Duration::from_millis(500) }
    }

    /// `[500ms, 1500ms)`, the spread added to the pause between batches.
    pub fn batch_default() -> Self {
        Jitter::Uniform { low: Duration::from_millis(500), high: Duration::from_millis(1500) }
    }

    /// Apply jitter to a delay duration
    pub fn apply(&self, delay: Duration) -> Duration {
        let mut rng = rng();
        self.apply_internal(delay, &mut rng)
    }

    /// Apply jitter with a custom RNG (for testing)
    pub fn apply_with_rng<R: Rng>(&self, delay: Duration, rng: &mut R) -> Duration {
        self.apply_internal(delay, rng)
    }

    fn as_millis_saturated(duration: Duration) -> u64 {
        duration.as_millis().try_into().unwrap_or(u64::MAX)
    }

    fn apply_internal<R: Rng>(&self, delay: Duration, rng: &mut R) -> Duration {
        match self {
            Jitter::None => delay,
            Jitter::Uniform { low, high } => {
                let low_ms = Self::as_millis_saturated(*low);
                let high_ms = Self::as_millis_saturated(*high);
                let extra = if low_ms >= high_ms { low_ms } else { rng.random_range(low_ms..high_ms) };
                delay.saturating_add(Duration::from_millis(extra))
            }
        }
    }
}
