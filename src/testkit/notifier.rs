//! A recording notification sink.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::adapter::outbound::notifier::format::MessageFormatter;
use crate::domain::{EnrichedEvent, EventId, RenderedMessage};
use crate::error::{Error, Result};
use crate::port::outbound::notifier::Notifier;

/// Records delivered messages in order.
///
/// Failures are scripted per event id: [`fail_once`](Self::fail_once) makes
/// the next delivery of that id fail, [`fail_always`](Self::fail_always)
/// makes every delivery of it fail.
#[derive(Default)]
pub struct RecordingNotifier {
    formatter: MessageFormatter,
    rendered: Mutex<HashMap<EventId, EnrichedEvent>>,
    delivered: Mutex<Vec<(RenderedMessage, Option<EnrichedEvent>)>>,
    fail_once: Mutex<HashSet<String>>,
    fail_always: Mutex<HashSet<String>>,
    attempts: AtomicUsize,
}

impl RecordingNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_once(&self, id: &str) {
        self.fail_once.lock().insert(id.to_string());
    }

    pub fn fail_always(&self, id: &str) {
        self.fail_always.lock().insert(id.to_string());
    }

    /// Stop failing `id`.
    pub fn recover(&self, id: &str) {
        self.fail_always.lock().remove(id);
        self.fail_once.lock().remove(id);
    }

    /// Ids of accepted messages, in delivery order.
    pub fn delivered_ids(&self) -> Vec<String> {
        self.delivered
            .lock()
            .iter()
            .map(|(m, _)| m.event_id.to_string())
            .collect()
    }

    pub fn delivered_messages(&self) -> Vec<RenderedMessage> {
        self.delivered.lock().iter().map(|(m, _)| m.clone()).collect()
    }

    /// Enriched events behind accepted messages.
    pub fn delivered_events(&self) -> Vec<EnrichedEvent> {
        self.delivered
            .lock()
            .iter()
            .filter_map(|(_, e)| e.clone())
            .collect()
    }

    /// Number of `deliver` calls, successful or not.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn render(&self, event: &EnrichedEvent) -> RenderedMessage {
        self.rendered
            .lock()
            .insert(event.raw.id.clone(), event.clone());
        self.formatter.render(event)
    }

    async fn deliver(&self, message: &RenderedMessage) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let id = message.event_id.as_str();
        if self.fail_always.lock().contains(id) || self.fail_once.lock().remove(id) {
            return Err(Error::Delivery(format!("scripted failure for {id}")));
        }
        let event = self.rendered.lock().get(&message.event_id).cloned();
        self.delivered.lock().push((message.clone(), event));
        Ok(())
    }

    fn sink_name(&self) -> &'static str {
        "recording"
    }
}
