#![allow(dead_code)]

use livesweep::{BatchRunner, InstantSleeper, MemorySink, RunConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("probe failed: {0}")]
pub struct TestError(pub String);

pub fn ids(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("id-{}", i)).collect()
}

pub fn config(batch_size: usize, max_retries: u32) -> RunConfig {
    RunConfig::builder()
        .batch_size(batch_size)
        .max_retries(max_retries)
        .inter_batch_delay(Duration::from_secs(1))
        .jitter(false)
        .build()
        .expect("valid config")
}

/// Runner that never waits on the wall clock, with all events captured.
pub fn instant_runner(config: RunConfig) -> (BatchRunner<MemorySink>, MemorySink) {
    let sink = MemorySink::new();
    let runner = BatchRunner::builder()
        .config(config)
        .with_sleeper(InstantSleeper)
        .with_sink(sink.clone())
        .build();
    (runner, sink)
}

/// Shared call counter for probes.
#[derive(Clone, Default)]
pub struct Calls(Arc<AtomicUsize>);

impl Calls {
    pub fn hit(&self) -> usize {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}
