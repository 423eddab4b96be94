//! The event-to-notification cycle.
//!
//! One cycle takes a batch from a source, filters it through the watermark
//! engine, enriches and renders each fresh event, hands it to the sink and
//! finally advances the watermark. Cycles run strictly one after another on a
//! single task, so cursor and seen-set writes never race.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::enrich::Enricher;
use super::watermark::{CycleProgress, Verdict, WatermarkEngine};
use crate::domain::event::sort_events;
use crate::domain::{Cursor, EventId, RawEvent};
use crate::port::outbound::notifier::Notifier;
use crate::port::outbound::source::SourceBatch;

/// Outcome counters for one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub fetched: usize,
    pub stale: usize,
    pub duplicates: usize,
    pub delivered: usize,
    pub failed: usize,
    /// New watermark, when the cycle moved it.
    pub advanced_to: Option<Cursor>,
    /// Events the sink rejected, in processing order.
    ///
    /// The watermark is held at the earliest of them. Sources that cannot
    /// replay (subscriptions) must present them again in a later cycle.
    pub pending: Vec<RawEvent>,
}

impl CycleReport {
    /// True when the cycle neither delivered nor failed anything.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.delivered == 0 && self.failed == 0
    }
}

/// Ties the watermark engine, enricher and sink together.
pub struct Pipeline {
    engine: WatermarkEngine,
    enricher: Enricher,
    notifier: Arc<dyn Notifier>,
}

impl Pipeline {
    #[must_use]
    pub fn new(engine: WatermarkEngine, enricher: Enricher, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            engine,
            enricher,
            notifier,
        }
    }

    /// The committed watermark.
    #[must_use]
    pub const fn cursor(&self) -> Cursor {
        self.engine.cursor()
    }

    /// Run one cycle over `batch`.
    ///
    /// A failed delivery does not stop the cycle. Later events are still
    /// attempted, and the watermark is held at the earliest failure so the
    /// failed event is presented again next cycle.
    pub async fn run_cycle(&mut self, batch: SourceBatch) -> CycleReport {
        let SourceBatch {
            mut events,
            truncated,
        } = batch;
        sort_events(&mut events);

        let mut report = CycleReport {
            fetched: events.len(),
            ..CycleReport::default()
        };
        let mut progress = CycleProgress::new(truncated);
        let mut attempted: HashSet<EventId> = HashSet::with_capacity(events.len());

        for event in &events {
            if !attempted.insert(event.id.clone()) {
                report.duplicates += 1;
                continue;
            }
            match self.engine.classify(event).await {
                Verdict::Stale => {
                    report.stale += 1;
                    continue;
                }
                Verdict::Duplicate => {
                    // Delivered in an earlier cycle; it no longer holds the watermark back.
                    progress.delivered(event.timestamp);
                    report.duplicates += 1;
                    continue;
                }
                Verdict::Fresh => {}
            }

            let enriched = self.enricher.enrich(event).await;
            let message = self.notifier.render(&enriched);

            match self.notifier.deliver(&message).await {
                Ok(()) => {
                    debug!(
                        event_id = %event.id,
                        kind = event.kind.name(),
                        timestamp = event.timestamp,
                        "Delivered"
                    );
                    self.engine
                        .commit(&mut progress, event.timestamp, &event.id)
                        .await;
                    report.delivered += 1;
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        sink = self.notifier.sink_name(),
                        event_id = %event.id,
                        timestamp = event.timestamp,
                        "Delivery failed, event left for retry"
                    );
                    progress.failed(event.timestamp);
                    report.failed += 1;
                    report.pending.push(event.clone());
                }
            }
        }

        report.advanced_to = self.engine.finish(&progress).await;

        if report.is_idle() {
            debug!(
                fetched = report.fetched,
                stale = report.stale,
                duplicates = report.duplicates,
                cursor = %self.cursor(),
                "Cycle complete"
            );
        } else {
            info!(
                fetched = report.fetched,
                stale = report.stale,
                duplicates = report.duplicates,
                delivered = report.delivered,
                failed = report.failed,
                cursor = %self.cursor(),
                "Cycle complete"
            );
        }
        report
    }
}
