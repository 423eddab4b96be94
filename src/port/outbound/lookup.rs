//! Enrichment lookup ports.

use alloy_primitives::U256;
use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::PositionKey;
use crate::error::Result;

/// Vault view of an open position.
///
/// Amounts are 1e30-scaled USD integers as returned by the vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionSnapshot {
    pub size: U256,
    pub collateral: U256,
    pub average_price: U256,
    pub has_profit: bool,
    pub delta: U256,
}

/// Reads current position state.
#[async_trait]
pub trait PositionLookup: Send + Sync {
    /// Current state of the position, `None` when it is closed.
    async fn position(&self, key: &PositionKey) -> Result<Option<PositionSnapshot>>;
}

/// Resolves a token symbol to a USD price.
#[async_trait]
pub trait PriceLookup: Send + Sync {
    async fn price_usd(&self, symbol: &str) -> Result<Decimal>;
}
