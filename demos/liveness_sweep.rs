//! Sweeping a list of account ids with a simulated liveness probe.
//!
//! Run with `cargo run --example liveness_sweep`. Set `RUST_LOG=debug` to see every attempt.
//! The sweep stops itself once 40 of the 60 ids are processed to show a graceful stop. A
//! separate status task follows batches over a broadcast channel while the run is in flight.
use livesweep::prelude::*;
use livesweep::{FnSink, MulticastSink, StreamingSink};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;

#[derive(Debug)]
struct Unreachable(String);

impl std::fmt::Display for Unreachable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} did not answer", self.0)
    }
}

impl std::error::Error for Unreachable {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Status {
    Live,
    Dead,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Status::Live => "LIVE",
            Status::Dead => "DEAD",
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), ConfigError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let list: String = (0..60).map(|i| format!("  account-{:02}\n\n", i)).collect();
    let ids = parse_items(&list)?;

    let streaming = StreamingSink::new(256);
    let mut events = streaming.subscribe();
    let status = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event @ (RunEvent::BatchStarted { .. } | RunEvent::RunStopped { .. })) => {
                    println!("-- {}", event)
                }
                Ok(_) => {}
                Err(RecvError::Lagged(n)) => println!("-- status fell behind by {} events", n),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let config = RunConfig::builder()
        .batch_size(8)
        .inter_batch_delay(Duration::from_millis(50))
        .max_retries(2)
        .build()?;
    let runner = BatchRunner::builder()
        .config(config)
        .backoff(Backoff::exponential(Duration::from_millis(20)))
        .retry_jitter(Jitter::uniform(Duration::ZERO, Duration::from_millis(20))?)
        .batch_jitter(Jitter::uniform(Duration::ZERO, Duration::from_millis(30))?)
        .with_sink(MulticastSink::new(
            FnSink::new(|event: &RunEvent| {
                if event.item().is_some() {
                    println!("{}", event);
                }
            }),
            streaming.clone(),
        ))
        .build();

    // Every seventh id flakes once, every eleventh never answers.
    let attempts = std::sync::Mutex::new(std::collections::HashMap::<String, u32>::new());
    let probe = |id: String| {
        let n: usize = id.trim_start_matches("account-").parse().unwrap_or(0);
        let seen = {
            let mut attempts = attempts.lock().unwrap_or_else(|e| e.into_inner());
            let entry = attempts.entry(id.clone()).or_insert(0);
            *entry += 1;
            *entry
        };
        async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            if n % 11 == 0 || (n % 7 == 0 && seen == 1) {
                Err(Unreachable(id))
            } else if n % 3 == 0 {
                Ok(Status::Dead)
            } else {
                Ok(Status::Live)
            }
        }
    };

    let cancel = CancelSignal::new();
    let tally = Tally::with_keys([Status::Live, Status::Dead]);
    let summary = runner
        .run(
            &ids,
            &probe,
            |report| {
                tally.record(&report.outcome);
                println!("{:>12}  {}  [{}]", report.item, report.progress, tally);
                if report.progress.processed >= 40 && cancel.cancel() {
                    println!("stop requested");
                }
            },
            &cancel,
        )
        .await;

    drop(runner);
    drop(streaming);
    let _ = status.await;

    println!();
    println!("{}", tally);
    println!("{}", summary.progress);
    println!("batches: {}  stopped early: {}", summary.batches, summary.stopped_early);
    Ok(())
}
