//! Cursor persistence port.
//!
//! The cursor store holds the watermark and the boundary seen-set. Only the
//! watermark engine mutates it; sources only read the cursor to parameterise
//! their next fetch.

use async_trait::async_trait;

use crate::domain::{Cursor, EventId, StoreCapability};
use crate::error::Result;

/// Durable storage for the watermark and seen-set.
///
/// # Implementation Notes
///
/// - `load` must not fail: read or parse errors fall back to [`Cursor::zero`].
/// - `save` must be atomic: a concurrent reader sees the old or the new
///   cursor, never a torn write.
/// - Stores without [`StoreCapability::Deduplicating`] answer `false` from
///   `is_seen` and treat `mark_seen`/`rotate` as no-ops.
/// - Seen-set writes must be idempotent per `(ts, id)`.
#[async_trait]
pub trait CursorStore: Send + Sync {
    /// Load the persisted cursor, or the zero cursor on first run or error.
    async fn load(&self) -> Cursor;

    /// Persist the cursor atomically.
    async fn save(&self, cursor: Cursor) -> Result<()>;

    /// Record that `id` was delivered at timestamp `ts`.
    async fn mark_seen(&self, ts: u64, id: &EventId) -> Result<()>;

    /// Whether `id` was already delivered at timestamp `ts`.
    async fn is_seen(&self, ts: u64, id: &EventId) -> Result<bool>;

    /// Drop seen-set buckets made obsolete by moving from `old_ts` to `new_ts`.
    ///
    /// Removes the `old_ts` bucket and anything else below `new_ts`. Does
    /// nothing unless `new_ts > old_ts`.
    async fn rotate(&self, old_ts: u64, new_ts: u64) -> Result<()>;

    /// Which delivery guarantees this backend supports.
    fn capability(&self) -> StoreCapability;

    /// Backend name for logging.
    fn backend_name(&self) -> &'static str;
}
