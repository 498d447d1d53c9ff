//! Partitioning of the input into fixed-size batches.
//!
//! Pure helpers, independent of the concurrent driver: every batch holds exactly `size` items
//! except possibly the last, which is never empty, and concatenating the batches reproduces the
//! input in order.

use std::num::NonZeroUsize;

/// Consecutive batches of at most `size` items.
pub fn batches<T>(items: &[T], size: NonZeroUsize) -> std::slice::Chunks<'_, T> {
    items.chunks(size.get())
}

/// Number of batches `len` items split into: `ceil(len / size)`.
pub fn batch_count(len: usize, size: NonZeroUsize) -> usize {
    len.div_ceil(size.get())
}
