//! Errors raised before a run starts.
//!
//! Per-item failures are not errors at this level: they surface as
//! [`Outcome::Failure`](crate::Outcome::Failure) carrying the probe's own error type, and never
//! abort the run.

use crate::backoff::BackoffError;
use crate::jitter::JitterError;

/// Rejected run configuration or input. Reported synchronously; the run never starts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("batch size must be at least 1")]
    ZeroBatchSize,
    #[error("identifier list is empty")]
    NoItems,
    #[error(transparent)]
    InvalidJitter(#[from] JitterError),
    #[error(transparent)]
    InvalidBackoff(#[from] BackoffError),
}
