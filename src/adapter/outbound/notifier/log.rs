//! Dry-run sink that writes messages to the log.

use async_trait::async_trait;
use tracing::info;

use super::format::MessageFormatter;
use crate::domain::{EnrichedEvent, RenderedMessage};
use crate::error::Result;
use crate::port::outbound::notifier::Notifier;

/// Logs every message at `info` and always succeeds.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier {
    formatter: MessageFormatter,
}

impl LogNotifier {
    #[must_use]
    pub fn new(formatter: MessageFormatter) -> Self {
        Self { formatter }
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    fn render(&self, event: &EnrichedEvent) -> RenderedMessage {
        self.formatter.render(event)
    }

    async fn deliver(&self, message: &RenderedMessage) -> Result<()> {
        info!(
            event_id = %message.event_id,
            timestamp = message.timestamp,
            text = %message.text,
            "Notification (dry run)"
        );
        Ok(())
    }

    fn sink_name(&self) -> &'static str {
        "log"
    }
}
