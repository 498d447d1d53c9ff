//! Run configuration and input validation.
//!
//! A [`RunConfig`] is immutable for the duration of one run. Build it with
//! [`RunConfig::builder`]; invalid values are rejected by `build()` so the runner never starts
//! with a configuration it cannot honour.
//!
//! ```rust
//! use livesweep::RunConfig;
//! use std::time::Duration;
//!
//! let config = RunConfig::builder()
//!     .batch_size(25)
//!     .inter_batch_delay(Duration::from_secs(2))
//!     .jitter(true)
//!     .max_retries(2)
//!     .build()
//!     .unwrap();
//! assert_eq!(config.batch_size().get(), 25);
//! ```

use crate::error::ConfigError;
use std::num::NonZeroUsize;
use std::time::Duration;

/// Batch width, pacing and retry budget for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunConfig {
    batch_size: NonZeroUsize,
    inter_batch_delay: Duration,
    jitter_enabled: bool,
    max_retries: u32,
}

impl RunConfig {
    pub fn builder() -> RunConfigBuilder {
        RunConfigBuilder::new()
    }

    /// Items per batch; also the concurrency width.
    pub fn batch_size(&self) -> NonZeroUsize {
        self.batch_size
    }

    /// Fixed pause between consecutive batches.
    pub fn inter_batch_delay(&self) -> Duration {
        self.inter_batch_delay
    }

    /// Whether the inter-batch pause gets an extra `[500ms, 1500ms)` of jitter.
    pub fn jitter_enabled(&self) -> bool {
        self.jitter_enabled
    }

    /// Retries after the initial attempt; total attempts per item is `max_retries + 1`.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            batch_size: NonZeroUsize::new(10).unwrap_or(NonZeroUsize::MIN),
            inter_batch_delay: Duration::ZERO,
            jitter_enabled: true,
            max_retries: 3,
        }
    }
}

/// Builder for [`RunConfig`].
#[derive(Debug, Clone)]
pub struct RunConfigBuilder {
    batch_size: usize,
    inter_batch_delay: Duration,
    jitter_enabled: bool,
    max_retries: u32,
}

impl RunConfigBuilder {
    pub fn new() -> Self {
        let defaults = RunConfig::default();
        Self {
            batch_size: defaults.batch_size.get(),
            inter_batch_delay: defaults.inter_batch_delay,
            jitter_enabled: defaults.jitter_enabled,
            max_retries: defaults.max_retries,
        }
    }

    /// Items per batch. Must be >= 1.
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    pub fn inter_batch_delay(mut self, delay: Duration) -> Self {
        self.inter_batch_delay = delay;
        self
    }

    pub fn jitter(mut self, enabled: bool) -> Self {
        self.jitter_enabled = enabled;
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn build(self) -> Result<RunConfig, ConfigError> {
        let batch_size = NonZeroUsize::new(self.batch_size).ok_or(ConfigError::ZeroBatchSize)?;
        Ok(RunConfig {
            batch_size,
            inter_batch_delay: self.inter_batch_delay,
            jitter_enabled: self.jitter_enabled,
            max_retries: self.max_retries,
        })
    }
}

impl Default for RunConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Flat, serialisable form of [`RunConfig`] for settings files and form inputs.
///
/// Delays are whole seconds, matching how operators enter them.
#[cfg(feature = "serde")]
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RunSettings {
    pub batch_size: usize,
    pub inter_batch_delay_secs: u64,
    pub jitter: bool,
    pub max_retries: u32,
}

#[cfg(feature = "serde")]
impl Default for RunSettings {
    fn default() -> Self {
        let defaults = RunConfig::default();
        Self {
            batch_size: defaults.batch_size.get(),
            inter_batch_delay_secs: defaults.inter_batch_delay.as_secs(),
            jitter: defaults.jitter_enabled,
            max_retries: defaults.max_retries,
        }
    }
}

#[cfg(feature = "serde")]
impl TryFrom<RunSettings> for RunConfig {
    type Error = ConfigError;

    fn try_from(settings: RunSettings) -> Result<Self, Self::Error> {
        RunConfig::builder()
            .batch_size(settings.batch_size)
            .inter_batch_delay(Duration::from_secs(settings.inter_batch_delay_secs))
            .jitter(settings.jitter)
            .max_retries(settings.max_retries)
            .build()
    }
}

/// Parse an identifier list: one per line, surrounding whitespace trimmed, blank lines dropped.
///
/// Order and duplicates are preserved; each line is processed and counted on its own.
pub fn parse_items(text: &str) -> Result<Vec<String>, ConfigError> {
    let items: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect();
    if items.is_empty() {
        return Err(ConfigError::NoItems);
    }
    Ok(items)
}
