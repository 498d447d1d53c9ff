use livesweep::telemetry::RunEvent;
use livesweep::{BatchRunner, CancelSignal, InstantSleeper, RunConfig};
use livesweep_jsonl::JsonlSink;
use std::time::Duration;
use tower_service::Service;

fn read_lines(path: &std::path::Path) -> Vec<serde_json::Value> {
    std::fs::read_to_string(path)
        .expect("file")
        .lines()
        .map(|line| serde_json::from_str(line).expect("valid json"))
        .collect()
}

#[tokio::test]
async fn writes_json_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("log.jsonl");
    let mut sink = JsonlSink::new(&path);

    sink.call(RunEvent::Retry {
        item: "alice".into(),
        attempt: 1,
        delay: Duration::from_millis(50),
        error: "connection reset".into(),
    })
    .await
    .unwrap();
    sink.call(RunEvent::Exhausted { item: "alice".into(), retries: 1, error: "timeout".into() })
        .await
        .unwrap();

    let lines = read_lines(&path);
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["kind"], "retry");
    assert_eq!(lines[0]["item"], "alice");
    assert_eq!(lines[0]["message"], "[RETRY] alice attempt 1 - connection reset");
    assert_eq!(lines[1]["kind"], "retry_exhausted");
}

#[tokio::test]
async fn records_a_whole_run() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run.jsonl");

    let config = RunConfig::builder()
        .batch_size(2)
        .max_retries(1)
        .inter_batch_delay(Duration::from_secs(1))
        .jitter(false)
        .build()
        .unwrap();
    let runner = BatchRunner::builder()
        .config(config)
        .with_sleeper(InstantSleeper)
        .with_sink(JsonlSink::new(&path))
        .build();

    let ids = ["a", "b", "c"];
    let probe = |id: String| async move {
        if id == "b" {
            Err(std::io::Error::other("down"))
        } else {
            Ok(())
        }
    };
    let summary = runner.run(&ids, &probe, |_| {}, &CancelSignal::new()).await;
    assert_eq!(summary.progress.failed, 1);

    let kinds: Vec<String> = read_lines(&path)
        .iter()
        .map(|line| line["kind"].as_str().unwrap().to_owned())
        .collect();
    assert_eq!(
        kinds,
        vec!["batch_started", "retry", "retry_exhausted", "batch_pause", "batch_started"]
    );
}
