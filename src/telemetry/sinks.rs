use super::events::RunEvent;
use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tower::Service;

type SinkFuture<E> = Pin<Box<dyn Future<Output = Result<(), E>> + Send>>;

/// A telemetry sink that consumes run events.
///
/// Sinks are plain `tower::Service<RunEvent>`s so they compose with standard tower combinators.
pub trait TelemetrySink:
    tower::Service<RunEvent, Response = (), Error = Self::SinkError> + Clone + Send + 'static
{
    /// The error type for this sink.
    type SinkError: std::error::Error + Send + 'static;
}

/// Best-effort emit helper that honors `poll_ready` and swallows errors.
///
/// A failing sink must never fail an item, so the event is dropped instead.
pub async fn emit_best_effort<S>(sink: S, event: RunEvent)
where
    S: tower::Service<RunEvent, Response = ()> + Send + Clone + 'static,
    S::Error: std::error::Error + Send + 'static,
    S::Future: Send + 'static,
{
    use tower::ServiceExt;

    if let Ok(mut ready_sink) = sink.ready_oneshot().await {
        let _ = ready_sink.call(event).await;
    }
}

/// A no-op telemetry sink that discards all events.
#[derive(Clone, Debug, Default)]
pub struct NullSink;

impl Service<RunEvent> for NullSink {
    type Response = ();
    type Error = Infallible;
    type Future = SinkFuture<Self::Error>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, _event: RunEvent) -> Self::Future {
        Box::pin(async { Ok(()) })
    }
}

impl TelemetrySink for NullSink {
    type SinkError = Infallible;
}

/// A telemetry sink that logs events using the `tracing` crate.
#[derive(Clone, Debug, Default)]
pub struct LogSink;

impl Service<RunEvent> for LogSink {
    type Response = ();
    type Error = Infallible;
    type Future = SinkFuture<Self::Error>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, event: RunEvent) -> Self::Future {
        match &event {
            RunEvent::Exhausted { .. } => tracing::warn!(kind = event.kind(), "{}", event),
            RunEvent::Retry { .. } | RunEvent::ItemCancelled { .. } => {
                tracing::debug!(kind = event.kind(), "{}", event)
            }
            _ => tracing::info!(kind = event.kind(), "{}", event),
        }
        Box::pin(async { Ok(()) })
    }
}

impl TelemetrySink for LogSink {
    type SinkError = Infallible;
}

/// A telemetry sink that stores events in memory, evicting the oldest past `capacity`.
#[derive(Clone, Debug)]
pub struct MemorySink {
    events: Arc<Mutex<Vec<RunEvent>>>,
    capacity: usize,
    evicted: Arc<AtomicU64>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::with_capacity(10_000)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
            capacity: capacity.max(1),
            evicted: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn events(&self) -> Vec<RunEvent> {
        self.lock().clone()
    }

    /// Number of stored events whose [`RunEvent::kind`] equals `kind`.
    pub fn count_kind(&self, kind: &str) -> usize {
        self.lock().iter().filter(|e| e.kind() == kind).count()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn evicted(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<RunEvent>> {
        self.events.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<RunEvent> for MemorySink {
    type Response = ();
    type Error = Infallible;
    type Future = SinkFuture<Self::Error>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, event: RunEvent) -> Self::Future {
        let mut guard = self.lock();
        if guard.len() >= self.capacity {
            guard.remove(0);
            self.evicted.fetch_add(1, Ordering::Relaxed);
        }
        guard.push(event);
        Box::pin(async { Ok(()) })
    }
}

impl TelemetrySink for MemorySink {
    type SinkError = Infallible;
}

/// Adapts a plain callback into a sink; the callback runs synchronously on `call`.
#[derive(Clone)]
pub struct FnSink {
    callback: Arc<dyn Fn(&RunEvent) + Send + Sync>,
}

impl FnSink {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&RunEvent) + Send + Sync + 'static,
    {
        Self { callback: Arc::new(callback) }
    }
}

impl std::fmt::Debug for FnSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnSink").field("callback", &"<callback>").finish()
    }
}

impl Service<RunEvent> for FnSink {
    type Response = ();
    type Error = Infallible;
    type Future = SinkFuture<Self::Error>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, event: RunEvent) -> Self::Future {
        (self.callback)(&event);
        Box::pin(async { Ok(()) })
    }
}

impl TelemetrySink for FnSink {
    type SinkError = Infallible;
}

/// Broadcasts events to any number of subscribers.
///
/// This is the channel-based progress path: the run keeps going on its own task while a UI or
/// status task consumes batch, retry and stop events from a receiver. Slow receivers lag rather
/// than block the run. Events sent while nobody is subscribed are counted as dropped.
#[derive(Clone, Debug)]
pub struct StreamingSink {
    sender: Arc<tokio::sync::broadcast::Sender<RunEvent>>,
    dropped: Arc<AtomicU64>,
}

impl StreamingSink {
    /// `capacity` events are buffered per receiver before it starts lagging.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = tokio::sync::broadcast::channel(capacity.max(1));
        Self { sender: Arc::new(sender), dropped: Arc::new(AtomicU64::new(0)) }
    }

    /// New receiver that sees every event emitted from now on. The receiver closes once the
    /// sink and all its clones (including those held by a runner) are dropped.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<RunEvent> {
        self.sender.subscribe()
    }

    pub fn subscribers(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Events emitted while nobody was subscribed.
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Service<RunEvent> for StreamingSink {
    type Response = ();
    type Error = Infallible;
    type Future = SinkFuture<Self::Error>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, event: RunEvent) -> Self::Future {
        if self.sender.send(event).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        Box::pin(async { Ok(()) })
    }
}

impl TelemetrySink for StreamingSink {
    type SinkError = Infallible;
}

#[derive(Debug)]
pub struct ComposedSinkError(Box<dyn std::error::Error + Send + Sync>);

impl std::fmt::Display for ComposedSinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "telemetry sink error: {}", self.0)
    }
}

impl std::error::Error for ComposedSinkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&*self.0)
    }
}

/// Sends every event to both sinks.
#[derive(Clone, Debug)]
pub struct MulticastSink<A, B> {
    sink_a: A,
    sink_b: B,
}

impl<A, B> MulticastSink<A, B> {
    pub fn new(sink_a: A, sink_b: B) -> Self {
        Self { sink_a, sink_b }
    }
}

impl<A, B> Service<RunEvent> for MulticastSink<A, B>
where
    A: tower::Service<RunEvent, Response = ()> + Clone + Send + 'static,
    A::Error: std::error::Error + Send + Sync + 'static,
    A::Future: Send + 'static,
    B: tower::Service<RunEvent, Response = ()> + Clone + Send + 'static,
    B::Error: std::error::Error + Send + Sync + 'static,
    B::Future: Send + 'static,
{
    type Response = ();
    type Error = ComposedSinkError;
    type Future = SinkFuture<Self::Error>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, event: RunEvent) -> Self::Future {
        let mut sink_a = self.sink_a.clone();
        let mut sink_b = self.sink_b.clone();
        let event_clone = event.clone();

        Box::pin(async move {
            let (res_a, res_b) = tokio::join!(sink_a.call(event), sink_b.call(event_clone));
            res_a.map_err(|e| ComposedSinkError(Box::new(e)))?;
            res_b.map_err(|e| ComposedSinkError(Box::new(e)))?;
            Ok(())
        })
    }
}

impl<A, B> TelemetrySink for MulticastSink<A, B>
where
    A: tower::Service<RunEvent, Response = ()> + Clone + Send + 'static,
    A::Error: std::error::Error + Send + Sync + 'static,
    A::Future: Send + 'static,
    B: tower::Service<RunEvent, Response = ()> + Clone + Send + 'static,
    B::Error: std::error::Error + Send + Sync + 'static,
    B::Future: Send + 'static,
{
    type SinkError = ComposedSinkError;
}
