//! JSONL sink for `livesweep`. Appends one run event per line.
//! Always writes; bring your own path.
//!
//! Each line is the event's JSON form plus a `message` field holding the operator log line, so
//! the file reads well with `jq` and with `cut`.

use livesweep::telemetry::{RunEvent, TelemetrySink};
use std::io;
use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};

#[derive(Clone, Debug)]
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl tower_service::Service<RunEvent> for JsonlSink {
    type Response = ();
    type Error = io::Error;
    type Future = Pin<Box<dyn std::future::Future<Output = Result<(), Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, event: RunEvent) -> Self::Future {
        let path = self.path.clone();
        let line = event_line(&event);
        Box::pin(async move {
            use tokio::io::AsyncWriteExt;
            let mut file =
                tokio::fs::OpenOptions::new().create(true).append(true).open(&path).await?;
            file.write_all(line.as_bytes()).await.map_err(|err| {
                tracing::warn!(path = %path.display(), %err, "failed to append run event");
                err
            })?;
            file.flush().await?;
            Ok(())
        })
    }
}

impl TelemetrySink for JsonlSink {
    type SinkError = io::Error;
}

fn event_line(event: &RunEvent) -> String {
    let mut value = event.to_json();
    if let Some(object) = value.as_object_mut() {
        object.insert("message".into(), serde_json::Value::String(event.to_string()));
    }
    value.to_string() + "\n"
}
