//! The unit of work: one attempt at checking one identifier.
//!
//! The engine is transport-agnostic. A probe might issue an HTTP request and classify the body,
//! query a registry, or anything else; it only has to return `Ok` or a displayable error. Any
//! closure `Fn(String) -> impl Future<Output = Result<T, E>>` is a probe.
//!
//! ```rust
//! use livesweep::Probe;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let probe = |id: String| async move {
//!     if id.is_empty() {
//!         Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty id"))
//!     } else {
//!         Ok(id.len())
//!     }
//! };
//! assert_eq!(probe.probe("abc").await.unwrap(), 3);
//! # });
//! ```

use async_trait::async_trait;
use std::future::Future;

/// A retryable, asynchronous check of a single identifier.
#[async_trait]
pub trait Probe: Send + Sync {
    /// Value reported on success (e.g. a live/dead verdict).
    type Output: Send;
    /// Failure of one attempt; retried until the budget runs out.
    type Error: std::error::Error + Send + Sync + 'static;

    async fn probe(&self, item: &str) -> Result<Self::Output, Self::Error>;
}

#[async_trait]
impl<F, Fut, T, E> Probe for F
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, E>> + Send,
    T: Send,
    E: std::error::Error + Send + Sync + 'static,
{
    type Output = T;
    type Error = E;

    async fn probe(&self, item: &str) -> Result<T, E> {
        (self)(item.to_owned()).await
    }
}
