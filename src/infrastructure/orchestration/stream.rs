//! Subscription loop for push-based sources.
//!
//! A forwarder task owns the stream and pushes decoded events into a bounded
//! channel. The pipeline side gathers them into micro-batches that close
//! after a quiet period or once `max_batch` events have arrived, then runs
//! one cycle per batch.
//!
//! Subscriptions never replay, so events the sink rejected are kept here and
//! folded into the next batch, or retried on their own after
//! `retry_interval` without new traffic. Since every retry cycle contains
//! them, the watermark stays capped at the earliest one until it goes out.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::application::Pipeline;
use crate::domain::RawEvent;
use crate::error::Result;
use crate::infrastructure::config::source::SourceConfig;
use crate::port::outbound::source::{EventStream, SourceBatch, StreamEvent};

/// Batching of subscription events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSettings {
    /// Quiet period that closes a batch.
    pub settle: Duration,
    pub max_batch: usize,
    pub channel_capacity: usize,
    /// Wait before rejected events are retried without new traffic.
    pub retry_interval: Duration,
}

impl From<&SourceConfig> for StreamSettings {
    fn from(config: &SourceConfig) -> Self {
        Self {
            settle: Duration::from_millis(config.settle_ms),
            max_batch: config.max_batch,
            channel_capacity: config.channel_capacity,
            retry_interval: Duration::from_millis(config.retry_interval_ms),
        }
    }
}

/// Connect, subscribe and forward events until the stream ends or the
/// receiver is dropped.
///
/// # Errors
///
/// Returns an error if the initial connect or subscribe fails. A
/// [`ReconnectingStream`](crate::infrastructure::source::ReconnectingStream)
/// absorbs those failures and retries them with backoff instead.
pub async fn spawn_forwarder<S>(
    mut stream: S,
    capacity: usize,
) -> Result<(JoinHandle<()>, mpsc::Receiver<RawEvent>)>
where
    S: EventStream + 'static,
{
    stream.connect().await?;
    stream.subscribe().await?;
    info!(stream = stream.stream_name(), "Subscription started");

    let (tx, rx) = mpsc::channel(capacity.max(1));
    let handle = tokio::spawn(async move {
        loop {
            match stream.next_event().await {
                Some(StreamEvent::Event(event)) => {
                    if tx.send(event).await.is_err() {
                        debug!("Batcher gone, stopping forwarder");
                        break;
                    }
                }
                Some(StreamEvent::Disconnected { reason }) => {
                    warn!(stream = stream.stream_name(), reason = %reason, "Stream disconnected");
                }
                None => {
                    warn!(stream = stream.stream_name(), "Stream ended");
                    break;
                }
            }
        }
        stream.disconnect().await;
    });

    Ok((handle, rx))
}

/// Wait for the next micro-batch.
///
/// Blocks until one event arrives, then keeps collecting until `settle`
/// passes without a new event or `max_batch` is reached. Returns `None` once
/// the channel is closed and drained.
///
/// Batches are always marked truncated: further events sharing the newest
/// ordering key may still be in flight, so the watermark stays at that key
/// and the seen-set covers what was already delivered there.
pub async fn next_batch(
    rx: &mut mpsc::Receiver<RawEvent>,
    settings: &StreamSettings,
) -> Option<SourceBatch> {
    let first = rx.recv().await?;
    Some(collect_batch(rx, first, settings).await)
}

async fn collect_batch(
    rx: &mut mpsc::Receiver<RawEvent>,
    first: RawEvent,
    settings: &StreamSettings,
) -> SourceBatch {
    let mut events = vec![first];
    while events.len() < settings.max_batch {
        match timeout(settings.settle, rx.recv()).await {
            Ok(Some(event)) => events.push(event),
            Ok(None) | Err(_) => break,
        }
    }
    SourceBatch {
        events,
        truncated: true,
    }
}

/// Run one cycle over `events` plus everything still pending, returning what
/// the sink rejected this time.
async fn deliver(
    pipeline: &mut Pipeline,
    mut events: Vec<RawEvent>,
    pending: Vec<RawEvent>,
) -> Vec<RawEvent> {
    let retried = pending.len();
    events.extend(pending);
    let report = pipeline
        .run_cycle(SourceBatch {
            events,
            truncated: true,
        })
        .await;
    if !report.pending.is_empty() {
        warn!(
            pending = report.pending.len(),
            retried,
            cursor = %pipeline.cursor(),
            "Deliveries failed, holding events for retry"
        );
    }
    report.pending
}

/// Run the subscription loop until shutdown or until the stream ends.
///
/// # Errors
///
/// Returns an error if the initial connect or subscribe fails.
pub async fn run_streaming<S>(
    pipeline: &mut Pipeline,
    stream: S,
    settings: StreamSettings,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()>
where
    S: EventStream + 'static,
{
    let (forwarder, mut rx) = spawn_forwarder(stream, settings.channel_capacity).await?;
    info!(
        settle_ms = settings.settle.as_millis() as u64,
        max_batch = settings.max_batch,
        cursor = %pipeline.cursor(),
        "Listening for events"
    );

    let mut pending: Vec<RawEvent> = Vec::new();
    loop {
        tokio::select! {
            result = shutdown.changed() => {
                if result.is_err() || *shutdown.borrow() {
                    info!("Subscription stopped");
                    break;
                }
            }
            received = rx.recv() => {
                let Some(first) = received else {
                    warn!("Event channel closed");
                    break;
                };
                let batch = collect_batch(&mut rx, first, &settings).await;
                pending = deliver(pipeline, batch.events, std::mem::take(&mut pending)).await;
            }
            () = sleep(settings.retry_interval), if !pending.is_empty() => {
                debug!(pending = pending.len(), "Retrying failed deliveries");
                pending = deliver(pipeline, Vec::new(), std::mem::take(&mut pending)).await;
            }
        }
    }

    if !pending.is_empty() {
        warn!(
            pending = pending.len(),
            cursor = %pipeline.cursor(),
            "Stopping with undelivered events; they are not replayed after restart"
        );
    }
    drop(rx);
    forwarder.abort();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    use crate::adapter::outbound::store::memory::MemoryCursorStore;
    use crate::application::{Enricher, WatermarkEngine};
    use crate::domain::{Cursor, TokenRegistry};
    use crate::error::Error;
    use crate::infrastructure::source::ReconnectingStream;
    use crate::testkit;
    use crate::testkit::domain::increase;
    use crate::testkit::notifier::RecordingNotifier;
    use crate::testkit::source::{ChannelStream, ScriptedStream};

    fn settings(max_batch: usize) -> StreamSettings {
        StreamSettings {
            settle: Duration::from_millis(20),
            max_batch,
            channel_capacity: 16,
            retry_interval: Duration::from_millis(30),
        }
    }

    fn pipeline(notifier: &Arc<RecordingNotifier>) -> Pipeline {
        let store = Arc::new(MemoryCursorStore::new());
        let engine = WatermarkEngine::with_cursor(store, Cursor::new(100));
        let enricher = Enricher::new(TokenRegistry::bnb_defaults(), Duration::from_secs(60));
        Pipeline::new(engine, enricher, notifier.clone())
    }

    #[tokio::test]
    async fn batch_closes_at_max_size() {
        let (tx, mut rx) = mpsc::channel(8);
        for i in 0..5 {
            tx.send(increase(&format!("e{i}"), 100 + i)).await.unwrap();
        }

        let batch = next_batch(&mut rx, &settings(3)).await.unwrap();
        assert_eq!(batch.events.len(), 3);
        assert!(batch.truncated);

        let rest = next_batch(&mut rx, &settings(3)).await.unwrap();
        assert_eq!(rest.events.len(), 2);
    }

    #[tokio::test]
    async fn batch_closes_after_quiet_period() {
        let (tx, mut rx) = mpsc::channel(8);
        tx.send(increase("a", 100)).await.unwrap();

        let batch = next_batch(&mut rx, &settings(10)).await.unwrap();
        assert_eq!(batch.events.len(), 1);
        drop(tx);
    }

    #[tokio::test]
    async fn closed_channel_ends_batching() {
        let (tx, mut rx) = mpsc::channel::<RawEvent>(1);
        drop(tx);
        assert!(next_batch(&mut rx, &settings(10)).await.is_none());
    }

    #[tokio::test]
    async fn bare_stream_reports_connect_failure() {
        let stream = ScriptedStream::new()
            .with_connect_results(vec![Err(Error::Connection("refused".into()))]);
        let result = spawn_forwarder(stream, 4).await;
        assert!(matches!(result, Err(Error::Connection(_))));
    }

    #[tokio::test]
    async fn reconnecting_stream_recovers_from_refused_first_connect() {
        let inner = ScriptedStream::new()
            .with_connect_results(vec![Err(Error::Connection("refused".into())), Ok(())])
            .with_events(vec![Some(StreamEvent::Event(increase("a", 100)))]);
        let counts = inner.counts();
        let stream = ReconnectingStream::new(inner, testkit::config::reconnection());

        let (handle, mut rx) = spawn_forwarder(stream, 4).await.unwrap();
        let first = rx.recv().await.unwrap();
        handle.abort();

        assert_eq!(first.id.as_str(), "a");
        assert_eq!(counts.connects.load(Ordering::SeqCst), 2);
        assert_eq!(counts.subscribes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn forwarder_skips_disconnect_notices() {
        let stream = ScriptedStream::new().with_events(vec![
            Some(StreamEvent::Event(increase("a", 100))),
            Some(StreamEvent::Disconnected {
                reason: "probe timeout".into(),
            }),
            Some(StreamEvent::Event(increase("b", 101))),
            None,
        ]);
        let counts = stream.counts();

        let (handle, mut rx) = spawn_forwarder(stream, 4).await.unwrap();
        handle.await.unwrap();

        assert_eq!(rx.recv().await.unwrap().id.as_str(), "a");
        assert_eq!(rx.recv().await.unwrap().id.as_str(), "b");
        assert!(rx.recv().await.is_none());
        assert_eq!(counts.disconnects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn streamed_events_reach_the_sink_once() {
        let notifier = Arc::new(RecordingNotifier::new());
        let mut pipeline = pipeline(&notifier);
        let (stream, events) = ChannelStream::pair();
        let (tx, rx) = watch::channel(false);

        for event in [
            increase("a", 100),
            increase("b", 101),
            increase("a", 100),
            increase("old", 50),
        ] {
            events.send(StreamEvent::Event(event)).unwrap();
        }

        let stopper = async {
            while notifier.delivered_ids().len() < 2 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            // One more settle period for anything that might follow.
            tokio::time::sleep(Duration::from_millis(50)).await;
            let _ = tx.send(true);
        };

        let (result, ()) = tokio::join!(run_streaming(&mut pipeline, stream, settings(10), rx), stopper);
        result.unwrap();

        assert_eq!(notifier.delivered_ids(), vec!["a", "b"]);
        // Truncated batches hold the watermark at the newest key.
        assert_eq!(pipeline.cursor(), Cursor::new(101));
        drop(events);
    }

    async fn wait_for(notifier: &RecordingNotifier, count: usize) {
        while notifier.delivered_ids().len() < count {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test]
    async fn rejected_event_rides_along_with_the_next_batch() {
        let notifier = Arc::new(RecordingNotifier::new());
        notifier.fail_once("x");
        let mut pipeline = pipeline(&notifier);
        let (stream, events) = ChannelStream::pair();
        let (tx, rx) = watch::channel(false);
        let settings = StreamSettings {
            retry_interval: Duration::from_secs(60),
            ..settings(10)
        };

        let driver = async {
            events.send(StreamEvent::Event(increase("x", 100))).unwrap();
            while notifier.attempts() < 1 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
            events.send(StreamEvent::Event(increase("y", 101))).unwrap();
            wait_for(&notifier, 2).await;
            tokio::time::sleep(Duration::from_millis(50)).await;
            events.send(StreamEvent::Event(increase("z", 102))).unwrap();
            wait_for(&notifier, 3).await;
            let _ = tx.send(true);
        };

        let (result, ()) = tokio::join!(run_streaming(&mut pipeline, stream, settings, rx), driver);
        result.unwrap();

        assert_eq!(notifier.delivered_ids(), vec!["x", "y", "z"]);
        assert_eq!(notifier.attempts(), 4);
        assert_eq!(pipeline.cursor(), Cursor::new(102));
    }

    #[tokio::test]
    async fn rejected_event_is_retried_without_new_traffic() {
        let notifier = Arc::new(RecordingNotifier::new());
        notifier.fail_once("x");
        let mut pipeline = pipeline(&notifier);
        let (stream, events) = ChannelStream::pair();
        let (tx, rx) = watch::channel(false);

        events.send(StreamEvent::Event(increase("x", 100))).unwrap();
        let stopper = async {
            wait_for(&notifier, 1).await;
            let _ = tx.send(true);
        };

        let (result, ()) = tokio::join!(run_streaming(&mut pipeline, stream, settings(10), rx), stopper);
        result.unwrap();

        assert_eq!(notifier.delivered_ids(), vec!["x"]);
        assert_eq!(notifier.attempts(), 2);
        drop(events);
    }

    #[tokio::test]
    async fn watermark_stays_below_an_undelivered_event() {
        let notifier = Arc::new(RecordingNotifier::new());
        notifier.fail_always("x");
        let mut pipeline = pipeline(&notifier);
        let (stream, events) = ChannelStream::pair();
        let (tx, rx) = watch::channel(false);

        let driver = async {
            events.send(StreamEvent::Event(increase("x", 103))).unwrap();
            while notifier.attempts() < 1 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
            events.send(StreamEvent::Event(increase("y", 105))).unwrap();
            wait_for(&notifier, 1).await;
            // A couple of timer retries.
            while notifier.attempts() < 5 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            let _ = tx.send(true);
        };

        let (result, ()) = tokio::join!(run_streaming(&mut pipeline, stream, settings(10), rx), driver);
        result.unwrap();

        assert_eq!(notifier.delivered_ids(), vec!["y"]);
        assert_eq!(pipeline.cursor(), Cursor::new(103));
    }

    #[tokio::test]
    async fn stream_end_stops_the_loop() {
        let notifier = Arc::new(RecordingNotifier::new());
        let mut pipeline = pipeline(&notifier);
        let (stream, events) = ChannelStream::pair();
        let (_tx, rx) = watch::channel(false);

        events.send(StreamEvent::Event(increase("a", 100))).unwrap();
        drop(events);

        run_streaming(&mut pipeline, stream, settings(10), rx)
            .await
            .unwrap();
        assert_eq!(notifier.delivered_ids(), vec!["a"]);
    }
}
