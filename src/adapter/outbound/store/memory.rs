//! In-memory cursor store for tests and dry runs.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::domain::{Cursor, EventId, StoreCapability};
use crate::error::{Error, Result};
use crate::port::outbound::cursor::CursorStore;

/// Cursor store that keeps everything in process memory.
///
/// Deduplicating by default. [`MemoryCursorStore::without_dedup`] builds a
/// best-effort variant, and [`MemoryCursorStore::fail_saves`] injects save
/// failures.
#[derive(Debug)]
pub struct MemoryCursorStore {
    cursor: RwLock<Cursor>,
    seen: RwLock<BTreeMap<u64, HashSet<EventId>>>,
    dedup: bool,
    fail_saves: AtomicBool,
}

impl Default for MemoryCursorStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCursorStore {
    /// Create an empty deduplicating store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cursor: RwLock::new(Cursor::zero()),
            seen: RwLock::new(BTreeMap::new()),
            dedup: true,
            fail_saves: AtomicBool::new(false),
        }
    }

    /// Create an empty store without a seen-set.
    #[must_use]
    pub fn without_dedup() -> Self {
        Self {
            dedup: false,
            ..Self::new()
        }
    }

    /// Start from a persisted cursor.
    #[must_use]
    pub fn with_cursor(self, cursor: Cursor) -> Self {
        *self.cursor.write() = cursor;
        self
    }

    /// Make subsequent `save` calls fail until switched off again.
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Timestamps that currently hold a seen-set bucket, ascending.
    #[must_use]
    pub fn seen_buckets(&self) -> Vec<u64> {
        self.seen.read().keys().copied().collect()
    }
}

#[async_trait]
impl CursorStore for MemoryCursorStore {
    async fn load(&self) -> Cursor {
        *self.cursor.read()
    }

    async fn save(&self, cursor: Cursor) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(Error::Database("injected save failure".into()));
        }
        *self.cursor.write() = cursor;
        Ok(())
    }

    async fn mark_seen(&self, ts: u64, id: &EventId) -> Result<()> {
        if self.dedup {
            self.seen.write().entry(ts).or_default().insert(id.clone());
        }
        Ok(())
    }

    async fn is_seen(&self, ts: u64, id: &EventId) -> Result<bool> {
        if !self.dedup {
            return Ok(false);
        }
        Ok(self
            .seen
            .read()
            .get(&ts)
            .is_some_and(|bucket| bucket.contains(id)))
    }

    async fn rotate(&self, old_ts: u64, new_ts: u64) -> Result<()> {
        if new_ts <= old_ts {
            return Ok(());
        }
        let mut seen = self.seen.write();
        *seen = seen.split_off(&new_ts);
        Ok(())
    }

    fn capability(&self) -> StoreCapability {
        if self.dedup {
            StoreCapability::Deduplicating
        } else {
            StoreCapability::BestEffort
        }
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
