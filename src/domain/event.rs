//! Raw position events as normalised at the source boundary.
//!
//! Every source (chain log subscription or polled subgraph) converts its
//! untyped payloads into [`RawEvent`] before anything downstream sees them,
//! so the rest of the pipeline only deals with the closed set of
//! [`EventKind`] variants.

use std::fmt;

use alloy_primitives::{Address, I256, U256};

/// Stable identifier of a source event.
///
/// Chain logs use `{tx_hash}:{log_index}`; subgraph entities use the entity
/// id. Re-observing the same logical event always yields the same id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(String);

impl EventId {
    /// Create a new event id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EventId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for EventId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Position side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// Map the protocol's `isLong` flag to a side.
    #[must_use]
    pub const fn from_is_long(is_long: bool) -> Self {
        if is_long {
            Self::Long
        } else {
            Self::Short
        }
    }

    #[must_use]
    pub const fn is_long(self) -> bool {
        matches!(self, Self::Long)
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Long => "LONG",
            Self::Short => "SHORT",
        }
    }
}

/// Identity of a position in the vault.
///
/// The vault keys positions by `(account, collateral token, index token, side)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PositionKey {
    pub account: Address,
    pub collateral_token: Address,
    pub index_token: Address,
    pub is_long: bool,
}

/// Payload shared by increase and decrease events.
///
/// All amounts are 1e30-scaled USD integers as emitted by the protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionChange {
    pub collateral_token: Address,
    pub index_token: Address,
    pub side: Side,
    pub size_delta: U256,
    pub collateral_delta: U256,
    /// Execution price; zero when the source does not report one.
    pub price: U256,
}

/// Payload of a liquidation event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Liquidation {
    pub collateral_token: Address,
    pub index_token: Address,
    pub side: Side,
    pub size: U256,
    pub collateral: U256,
    pub mark_price: U256,
    pub realised_pnl: I256,
}

/// The closed set of event kinds the relay understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// A position was opened or increased.
    Increase(PositionChange),
    /// A position was reduced or closed.
    Decrease(PositionChange),
    /// A position was liquidated.
    Liquidation(Liquidation),
}

impl EventKind {
    /// Short kind name used in logs and persisted diagnostics.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Increase(_) => "increase",
            Self::Decrease(_) => "decrease",
            Self::Liquidation(_) => "liquidation",
        }
    }

    #[must_use]
    pub const fn index_token(&self) -> Address {
        match self {
            Self::Increase(c) | Self::Decrease(c) => c.index_token,
            Self::Liquidation(l) => l.index_token,
        }
    }

    #[must_use]
    pub const fn collateral_token(&self) -> Address {
        match self {
            Self::Increase(c) | Self::Decrease(c) => c.collateral_token,
            Self::Liquidation(l) => l.collateral_token,
        }
    }

    #[must_use]
    pub const fn side(&self) -> Side {
        match self {
            Self::Increase(c) | Self::Decrease(c) => c.side,
            Self::Liquidation(l) => l.side,
        }
    }
}

/// A source event before enrichment.
///
/// `timestamp` is the source's ordering key. It is non-decreasing per source
/// but many events may share one value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub id: EventId,
    pub timestamp: u64,
    pub account: Address,
    /// Transaction hash, when the source exposes one.
    pub tx_hash: Option<String>,
    pub kind: EventKind,
}

impl RawEvent {
    /// Vault key of the position this event touched.
    #[must_use]
    pub fn position_key(&self) -> PositionKey {
        PositionKey {
            account: self.account,
            collateral_token: self.kind.collateral_token(),
            index_token: self.kind.index_token(),
            is_long: self.kind.side().is_long(),
        }
    }
}

/// Sort a batch into pipeline order: ascending timestamp, ties broken by id.
pub fn sort_events(events: &mut [RawEvent]) {
    events.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change() -> PositionChange {
        PositionChange {
            collateral_token: Address::repeat_byte(1),
            index_token: Address::repeat_byte(2),
            side: Side::Long,
            size_delta: U256::ZERO,
            collateral_delta: U256::ZERO,
            price: U256::ZERO,
        }
    }

    fn event(id: &str, timestamp: u64) -> RawEvent {
        RawEvent {
            id: EventId::new(id),
            timestamp,
            account: Address::repeat_byte(9),
            tx_hash: None,
            kind: EventKind::Increase(change()),
        }
    }

    #[test]
    fn sort_orders_by_timestamp_then_id() {
        let mut events = vec![event("b", 5), event("c", 1), event("a", 5)];
        sort_events(&mut events);

        let order: Vec<_> = events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(order, vec!["c", "a", "b"]);
    }

    #[test]
    fn position_key_uses_kind_tokens() {
        let e = event("a", 1);
        let key = e.position_key();
        assert_eq!(key.account, Address::repeat_byte(9));
        assert_eq!(key.collateral_token, Address::repeat_byte(1));
        assert_eq!(key.index_token, Address::repeat_byte(2));
        assert!(key.is_long);
    }

    #[test]
    fn side_labels() {
        assert_eq!(Side::from_is_long(true).label(), "LONG");
        assert_eq!(Side::from_is_long(false).label(), "SHORT");
    }
}
