//! Enrichment lookup doubles.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::PositionKey;
use crate::error::{Error, Result};
use crate::port::outbound::lookup::{PositionLookup, PositionSnapshot, PriceLookup};

/// Answers every position query with the same snapshot, or fails.
pub struct StaticPositions {
    snapshot: Option<PositionSnapshot>,
    fail: bool,
    calls: AtomicUsize,
}

impl StaticPositions {
    #[must_use]
    pub fn new(snapshot: Option<PositionSnapshot>) -> Self {
        Self {
            snapshot,
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn failing() -> Self {
        Self {
            snapshot: None,
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of lookups that reached this double.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PositionLookup for StaticPositions {
    async fn position(&self, _key: &PositionKey) -> Result<Option<PositionSnapshot>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::Connection("position lookup unavailable".into()));
        }
        Ok(self.snapshot)
    }
}

/// Prices every symbol at the same value.
pub struct StaticPrices {
    price: Decimal,
}

impl StaticPrices {
    #[must_use]
    pub fn new(price: Decimal) -> Self {
        Self { price }
    }
}

#[async_trait]
impl PriceLookup for StaticPrices {
    async fn price_usd(&self, _symbol: &str) -> Result<Decimal> {
        Ok(self.price)
    }
}

/// A price feed that is always down.
pub struct FailingPrices;

#[async_trait]
impl PriceLookup for FailingPrices {
    async fn price_usd(&self, symbol: &str) -> Result<Decimal> {
        Err(Error::Connection(format!("no price feed for {symbol}")))
    }
}
