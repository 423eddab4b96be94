//! Rendered notification payloads.

use super::event::EventId;

/// A formatted notification plus the bookkeeping needed to commit it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub event_id: EventId,
    pub timestamp: u64,
    pub text: String,
}

impl RenderedMessage {
    pub fn new(event_id: EventId, timestamp: u64, text: impl Into<String>) -> Self {
        Self {
            event_id,
            timestamp,
            text: text.into(),
        }
    }
}
