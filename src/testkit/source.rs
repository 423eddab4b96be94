//! Scripted event sources.
//!
//! - [`ScriptedSource`] - a [`PollingSource`] answering from a queue of
//!   batches and recording each request.
//! - [`ScriptedStream`] - an [`EventStream`] with pre-loaded connect and
//!   subscribe results and a fixed event queue.
//! - [`ChannelStream`] - an [`EventStream`] fed on demand through a channel.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::port::outbound::source::{
    EventStream, PollRequest, PollingSource, SourceBatch, StreamEvent,
};

// ---------------------------------------------------------------------------
// ScriptedSource
// ---------------------------------------------------------------------------

/// A polling source that pops one scripted result per call.
///
/// Returns an empty batch once the script is exhausted.
#[derive(Default)]
pub struct ScriptedSource {
    results: Mutex<VecDeque<Result<SourceBatch>>>,
    requests: Mutex<Vec<PollRequest>>,
}

impl ScriptedSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_batches(self, batches: Vec<SourceBatch>) -> Self {
        self.results.lock().extend(batches.into_iter().map(Ok));
        self
    }

    pub fn push(&self, result: Result<SourceBatch>) {
        self.results.lock().push_back(result);
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<PollRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl PollingSource for ScriptedSource {
    async fn poll(&self, request: PollRequest) -> Result<SourceBatch> {
        self.requests.lock().push(request);
        self.results
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(SourceBatch::empty()))
    }

    fn source_name(&self) -> &'static str {
        "scripted"
    }
}

// ---------------------------------------------------------------------------
// ScriptedStream
// ---------------------------------------------------------------------------

/// Shared call counters of a [`ScriptedStream`].
#[derive(Debug, Clone, Default)]
pub struct StreamCounts {
    pub connects: Arc<AtomicU32>,
    pub subscribes: Arc<AtomicU32>,
    pub disconnects: Arc<AtomicU32>,
}

/// A mock stream with scripted connect/subscribe results and a fixed event queue.
///
/// Each call to `connect()` or `subscribe()` pops the next result from the
/// corresponding queue (defaults to `Ok(())` when exhausted). A `None` entry
/// in the event queue simulates the stream ending.
#[derive(Default)]
pub struct ScriptedStream {
    connect_results: VecDeque<Result<()>>,
    subscribe_results: VecDeque<Result<()>>,
    events: VecDeque<Option<StreamEvent>>,
    counts: StreamCounts,
}

impl ScriptedStream {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_connect_results(mut self, results: Vec<Result<()>>) -> Self {
        self.connect_results = results.into();
        self
    }

    #[must_use]
    pub fn with_subscribe_results(mut self, results: Vec<Result<()>>) -> Self {
        self.subscribe_results = results.into();
        self
    }

    #[must_use]
    pub fn with_events(mut self, events: Vec<Option<StreamEvent>>) -> Self {
        self.events = events.into();
        self
    }

    /// Shared counters for asserting call counts after the stream is moved.
    #[must_use]
    pub fn counts(&self) -> StreamCounts {
        self.counts.clone()
    }
}

#[async_trait]
impl EventStream for ScriptedStream {
    async fn connect(&mut self) -> Result<()> {
        self.counts.connects.fetch_add(1, Ordering::SeqCst);
        self.connect_results.pop_front().unwrap_or(Ok(()))
    }

    async fn subscribe(&mut self) -> Result<()> {
        self.counts.subscribes.fetch_add(1, Ordering::SeqCst);
        self.subscribe_results.pop_front().unwrap_or(Ok(()))
    }

    async fn next_event(&mut self) -> Option<StreamEvent> {
        self.events.pop_front().flatten()
    }

    async fn disconnect(&mut self) {
        self.counts.disconnects.fetch_add(1, Ordering::SeqCst);
    }

    fn stream_name(&self) -> &'static str {
        "scripted"
    }
}

// ---------------------------------------------------------------------------
// ChannelStream
// ---------------------------------------------------------------------------

/// A stream that yields whatever is sent through its handle.
///
/// Ends when every sender is dropped.
pub struct ChannelStream {
    receiver: mpsc::UnboundedReceiver<StreamEvent>,
}

impl ChannelStream {
    #[must_use]
    pub fn pair() -> (Self, mpsc::UnboundedSender<StreamEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { receiver }, sender)
    }
}

#[async_trait]
impl EventStream for ChannelStream {
    async fn connect(&mut self) -> Result<()> {
        Ok(())
    }

    async fn subscribe(&mut self) -> Result<()> {
        Ok(())
    }

    async fn next_event(&mut self) -> Option<StreamEvent> {
        self.receiver.recv().await
    }

    async fn disconnect(&mut self) {}

    fn stream_name(&self) -> &'static str {
        "channel"
    }
}
