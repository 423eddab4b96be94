//! Watermark cursor and store capability types.

use std::fmt;

/// Exclusive watermark: every event with `timestamp < last_ts` has been
/// durably processed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Cursor {
    pub last_ts: u64,
}

impl Cursor {
    #[must_use]
    pub const fn new(last_ts: u64) -> Self {
        Self { last_ts }
    }

    /// The first-run cursor.
    #[must_use]
    pub const fn zero() -> Self {
        Self { last_ts: 0 }
    }

    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.last_ts == 0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lastTs={}", self.last_ts)
    }
}

/// Name of a cursor namespace.
///
/// Each source kind orders events by a different key (block timestamps for
/// the subgraph, block numbers for chain logs), so their watermarks must
/// never be mixed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StreamName(String);

impl StreamName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StreamName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a cursor store can guarantee.
///
/// Delivery properties of the pipeline depend on which backend is active:
/// with [`StoreCapability::BestEffort`] events sharing the boundary timestamp
/// may be delivered twice after a partial failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreCapability {
    /// Persists the watermark only; `is_seen` always answers `false`.
    BestEffort,
    /// Persists the watermark and the boundary seen-set.
    Deduplicating,
}

impl StoreCapability {
    #[must_use]
    pub const fn deduplicates(self) -> bool {
        matches!(self, Self::Deduplicating)
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::BestEffort => "best-effort",
            Self::Deduplicating => "deduplicating",
        }
    }
}
