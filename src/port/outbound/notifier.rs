//! Notification sink port.

use async_trait::async_trait;

use crate::domain::{EnrichedEvent, RenderedMessage};
use crate::error::Result;

/// A notification sink.
///
/// # Implementation Notes
///
/// - `deliver` is atomic from the pipeline's point of view: `Ok` means the
///   sink accepted the message, `Err` means it did not and the event will be
///   retried on a later cycle.
/// - Implementations must not retry internally without bound; a slow sink
///   stalls the whole cycle.
/// - Implementations must be thread-safe (`Send + Sync`).
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Format an enriched event for this sink.
    fn render(&self, event: &EnrichedEvent) -> RenderedMessage;

    /// Hand a rendered message to the sink.
    async fn deliver(&self, message: &RenderedMessage) -> Result<()>;

    /// Sink name for logging.
    fn sink_name(&self) -> &'static str;
}
