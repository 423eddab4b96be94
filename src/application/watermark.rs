//! Deduplication and watermark advancement.
//!
//! Sources only expose second-granularity (or block-granularity) ordering
//! keys and many events legitimately share one. The engine combines an
//! exclusive watermark with a seen-set at the boundary timestamp so that
//! events are delivered at least once and duplicates are suppressed without
//! the origin exposing a strictly unique cursor.
//!
//! # Watermark convention
//!
//! The cursor is exclusive: `last_ts = T` means every event with
//! `timestamp < T` is done. A cycle that delivers everything up to `newest`
//! advances to `newest + 1`. Two cases hold the watermark back:
//!
//! - a truncated batch advances only to `newest`, because more events at
//!   `newest` may still be waiting at the origin;
//! - a delivery failure at `T` caps the watermark at `T`, so the failed
//!   event is retried next cycle.
//!
//! Events at or above the watermark are checked against the seen-set. When a
//! delivery fails mid-cycle, later delivered events sit above the retained
//! watermark and the seen-set keeps them from being delivered twice.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::{Cursor, EventId, RawEvent, StoreCapability};
use crate::port::outbound::cursor::CursorStore;

/// Classification of an incoming event against the committed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Older than the watermark; handled in an earlier cycle.
    Stale,
    /// Already delivered, per the seen-set.
    Duplicate,
    /// Must be processed.
    Fresh,
}

/// Per-cycle bookkeeping for the watermark decision.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleProgress {
    newest_delivered: Option<u64>,
    first_failure: Option<u64>,
    truncated: bool,
}

impl CycleProgress {
    #[must_use]
    pub fn new(truncated: bool) -> Self {
        Self {
            truncated,
            ..Self::default()
        }
    }

    /// Track a confirmed delivery at `ts`.
    pub fn delivered(&mut self, ts: u64) {
        self.newest_delivered = Some(self.newest_delivered.map_or(ts, |n| n.max(ts)));
    }

    /// Track a failed delivery at `ts`.
    pub fn failed(&mut self, ts: u64) {
        self.first_failure = Some(self.first_failure.map_or(ts, |f| f.min(ts)));
    }

    /// Watermark this cycle justifies, if any.
    #[must_use]
    pub fn target(&self) -> Option<u64> {
        let newest = self.newest_delivered?;
        let complete_up_to = if self.truncated {
            newest
        } else {
            newest.saturating_add(1)
        };
        Some(match self.first_failure {
            Some(failed_at) => complete_up_to.min(failed_at),
            None => complete_up_to,
        })
    }
}

/// Owns the cursor and decides what is delivered and when the watermark moves.
pub struct WatermarkEngine {
    store: Arc<dyn CursorStore>,
    cursor: Cursor,
}

impl WatermarkEngine {
    /// Load the persisted cursor and build an engine around it.
    pub async fn open(store: Arc<dyn CursorStore>) -> Self {
        let cursor = store.load().await;
        info!(
            backend = store.backend_name(),
            capability = store.capability().label(),
            cursor = %cursor,
            "Cursor loaded"
        );
        if !store.capability().deduplicates() {
            warn!("Cursor store has no seen-set; boundary events may be delivered twice after a failure");
        }
        Self { store, cursor }
    }

    /// Build an engine with an explicit starting cursor.
    ///
    /// Used for first runs that start from "now" instead of replaying history.
    #[must_use]
    pub fn with_cursor(store: Arc<dyn CursorStore>, cursor: Cursor) -> Self {
        Self { store, cursor }
    }

    /// The committed watermark.
    #[must_use]
    pub const fn cursor(&self) -> Cursor {
        self.cursor
    }

    #[must_use]
    pub fn capability(&self) -> StoreCapability {
        self.store.capability()
    }

    /// Classify an event against the watermark and seen-set.
    ///
    /// A failing seen-set lookup counts as "not seen": a possible duplicate
    /// is preferred over a lost event.
    pub async fn classify(&self, event: &RawEvent) -> Verdict {
        if event.timestamp < self.cursor.last_ts {
            return Verdict::Stale;
        }
        match self.store.is_seen(event.timestamp, &event.id).await {
            Ok(true) => Verdict::Duplicate,
            Ok(false) => Verdict::Fresh,
            Err(e) => {
                warn!(error = %e, event_id = %event.id, "Seen-set lookup failed, treating as unseen");
                Verdict::Fresh
            }
        }
    }

    /// Commit a delivered event to the seen-set and cycle progress.
    pub async fn commit(&self, progress: &mut CycleProgress, ts: u64, id: &EventId) {
        if let Err(e) = self.store.mark_seen(ts, id).await {
            warn!(error = %e, event_id = %id, "Failed to mark event seen");
        }
        progress.delivered(ts);
    }

    /// Advance and persist the watermark at the end of a cycle.
    ///
    /// Returns the new watermark when it moved. The in-memory cursor only
    /// changes after the store confirmed the save.
    pub async fn finish(&mut self, progress: &CycleProgress) -> Option<Cursor> {
        let target = progress.target()?;
        if target <= self.cursor.last_ts {
            debug!(target, cursor = %self.cursor, "Watermark unchanged");
            return None;
        }

        let old = self.cursor;
        let new = Cursor::new(target);
        if let Err(e) = self.store.save(new).await {
            warn!(error = %e, from = %old, to = %new, "Failed to persist cursor, will retry next cycle");
            return None;
        }
        self.cursor = new;

        if let Err(e) = self.store.rotate(old.last_ts, new.last_ts).await {
            warn!(error = %e, "Failed to rotate seen-set");
        }

        debug!(from = %old, to = %new, "Watermark advanced");
        Some(new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::outbound::store::memory::MemoryCursorStore;
    use crate::testkit;

    fn engine_at(store: &Arc<MemoryCursorStore>, last_ts: u64) -> WatermarkEngine {
        WatermarkEngine::with_cursor(store.clone(), Cursor::new(last_ts))
    }

    #[test]
    fn complete_batch_targets_newest_plus_one() {
        let mut progress = CycleProgress::new(false);
        progress.delivered(1000);
        progress.delivered(1005);
        assert_eq!(progress.target(), Some(1006));
    }

    #[test]
    fn truncated_batch_targets_newest() {
        let mut progress = CycleProgress::new(true);
        progress.delivered(1005);
        assert_eq!(progress.target(), Some(1005));
    }

    #[test]
    fn failure_caps_target() {
        let mut progress = CycleProgress::new(false);
        progress.delivered(1000);
        progress.failed(1010);
        progress.delivered(1020);
        assert_eq!(progress.target(), Some(1010));
    }

    #[test]
    fn earliest_failure_wins() {
        let mut progress = CycleProgress::new(false);
        progress.delivered(1030);
        progress.failed(1020);
        progress.failed(1010);
        assert_eq!(progress.target(), Some(1010));
    }

    #[test]
    fn nothing_delivered_has_no_target() {
        let mut progress = CycleProgress::new(false);
        progress.failed(1000);
        assert_eq!(progress.target(), None);
    }

    #[tokio::test]
    async fn classify_rejects_older_than_watermark() {
        let store = Arc::new(MemoryCursorStore::new());
        let engine = engine_at(&store, 1006);

        let verdict = engine.classify(&testkit::domain::increase("a", 1000)).await;
        assert_eq!(verdict, Verdict::Stale);
    }

    #[tokio::test]
    async fn classify_checks_seen_set_at_boundary() {
        let store = Arc::new(MemoryCursorStore::new());
        store.mark_seen(1000, &EventId::new("a")).await.unwrap();
        let engine = engine_at(&store, 1000);

        let seen = engine.classify(&testkit::domain::increase("a", 1000)).await;
        let unseen = engine.classify(&testkit::domain::increase("b", 1000)).await;
        assert_eq!(seen, Verdict::Duplicate);
        assert_eq!(unseen, Verdict::Fresh);
    }

    #[tokio::test]
    async fn classify_accepts_newer_events() {
        let store = Arc::new(MemoryCursorStore::new());
        let engine = engine_at(&store, 1000);

        let verdict = engine.classify(&testkit::domain::increase("c", 1005)).await;
        assert_eq!(verdict, Verdict::Fresh);
    }

    #[tokio::test]
    async fn best_effort_store_never_reports_duplicates() {
        let store = Arc::new(MemoryCursorStore::without_dedup());
        store.mark_seen(1000, &EventId::new("a")).await.unwrap();
        let engine = engine_at(&store, 1000);

        let verdict = engine.classify(&testkit::domain::increase("a", 1000)).await;
        assert_eq!(verdict, Verdict::Fresh);
    }

    #[tokio::test]
    async fn finish_persists_and_rotates() {
        let store = Arc::new(MemoryCursorStore::new());
        let mut engine = engine_at(&store, 1000);
        let mut progress = CycleProgress::new(false);

        engine.commit(&mut progress, 1000, &EventId::new("a")).await;
        engine.commit(&mut progress, 1005, &EventId::new("c")).await;
        let advanced = engine.finish(&progress).await;

        assert_eq!(advanced, Some(Cursor::new(1006)));
        assert_eq!(engine.cursor(), Cursor::new(1006));
        assert_eq!(store.load().await, Cursor::new(1006));
        assert!(store.seen_buckets().is_empty());
    }

    #[tokio::test]
    async fn failed_save_keeps_in_memory_cursor() {
        let store = Arc::new(MemoryCursorStore::new());
        store.fail_saves(true);
        let mut engine = engine_at(&store, 1000);
        let mut progress = CycleProgress::new(false);
        engine.commit(&mut progress, 1003, &EventId::new("a")).await;

        assert_eq!(engine.finish(&progress).await, None);
        assert_eq!(engine.cursor(), Cursor::new(1000));

        store.fail_saves(false);
        assert_eq!(engine.finish(&progress).await, Some(Cursor::new(1004)));
    }

    #[tokio::test]
    async fn watermark_never_moves_backwards() {
        let store = Arc::new(MemoryCursorStore::new());
        let mut engine = engine_at(&store, 2000);
        let mut progress = CycleProgress::new(false);
        progress.delivered(1500);

        assert_eq!(engine.finish(&progress).await, None);
        assert_eq!(engine.cursor(), Cursor::new(2000));
    }

    #[tokio::test]
    async fn boundary_bucket_survives_capped_advance() {
        let store = Arc::new(MemoryCursorStore::new());
        let mut engine = engine_at(&store, 1000);
        let mut progress = CycleProgress::new(false);

        engine.commit(&mut progress, 1000, &EventId::new("a")).await;
        engine.commit(&mut progress, 1010, &EventId::new("y")).await;
        progress.failed(1010);
        engine.finish(&progress).await;

        assert_eq!(engine.cursor(), Cursor::new(1010));
        assert_eq!(store.seen_buckets(), vec![1010]);
    }
}
