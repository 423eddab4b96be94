//! Event source ports.
//!
//! Two source shapes feed the same pipeline: a pull-based paginated query
//! keyed by the watermark ([`PollingSource`]) and a push-based subscription
//! ([`EventStream`]). Both hand over [`RawEvent`]s already normalised at the
//! adapter boundary.

use async_trait::async_trait;

use crate::domain::{Cursor, RawEvent};
use crate::error::Result;

/// Parameters for one page of a polled query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollRequest {
    /// Current watermark; the source returns events with `timestamp >= since.last_ts`.
    pub since: Cursor,
    /// Page size per event kind.
    pub limit: usize,
}

impl PollRequest {
    #[must_use]
    pub const fn new(since: Cursor, limit: usize) -> Self {
        Self { since, limit }
    }
}

/// Result of one polled page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceBatch {
    /// Events in ascending `(timestamp, id)` order.
    pub events: Vec<RawEvent>,
    /// True when the origin had more events than the page could hold.
    ///
    /// When set, the last timestamp in `events` may be incomplete and the
    /// watermark must not move past it.
    pub truncated: bool,
}

impl SourceBatch {
    #[must_use]
    pub fn complete(events: Vec<RawEvent>) -> Self {
        Self {
            events,
            truncated: false,
        }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Pull-based source queried once per cycle.
#[async_trait]
pub trait PollingSource: Send + Sync {
    /// Fetch up to `request.limit` events per kind at or after the watermark.
    ///
    /// # Errors
    ///
    /// Returns an error for transport failures. Garbled responses are
    /// reported as an empty batch rather than an error.
    async fn poll(&self, request: PollRequest) -> Result<SourceBatch>;

    /// Source name for logging.
    fn source_name(&self) -> &'static str;
}

/// Item yielded by an [`EventStream`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A decoded event.
    Event(RawEvent),
    /// The connection was lost or found dead by the liveness probe.
    Disconnected { reason: String },
}

/// Push-based subscription source.
///
/// A stream is a connection handle: `disconnect` tears down its
/// registrations so a replacement can be installed cleanly.
#[async_trait]
pub trait EventStream: Send {
    /// Open the transport.
    async fn connect(&mut self) -> Result<()>;

    /// Register for all event kinds on the open transport.
    async fn subscribe(&mut self) -> Result<()>;

    /// Wait for the next event. `None` means the stream ended.
    async fn next_event(&mut self) -> Option<StreamEvent>;

    /// Unregister and close the transport. Safe to call when not connected.
    async fn disconnect(&mut self);

    /// Stream name for logging.
    fn stream_name(&self) -> &'static str;
}
