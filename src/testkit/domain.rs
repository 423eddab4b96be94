//! Builders for domain primitives used across tests.

use alloy_primitives::{address, Address, I256, U256};

use crate::domain::amount::USD_DECIMALS;
use crate::domain::{EventId, EventKind, Liquidation, PositionChange, RawEvent, Side};

pub const TRADER: Address = address!("00000000000000000000000000000000000000aa");
pub const BTC: Address = address!("7130d2A12B9BCbFAe4f2634d864A1Ee1Ce3Ead9c");
pub const USDC: Address = address!("8ac76a51cc950d9822d68b83fe1ad97b32cd580d");

/// Whole dollars as a 1e30-scaled protocol amount.
#[must_use]
pub fn usd(whole: u64) -> U256 {
    U256::from(whole) * U256::from(10u64).pow(U256::from(USD_DECIMALS))
}

fn raw(id: &str, timestamp: u64, kind: EventKind) -> RawEvent {
    RawEvent {
        id: EventId::new(id),
        timestamp,
        account: TRADER,
        tx_hash: None,
        kind,
    }
}

fn change(size: u64, collateral: u64, price: u64) -> PositionChange {
    PositionChange {
        collateral_token: USDC,
        index_token: BTC,
        side: Side::Long,
        size_delta: usd(size),
        collateral_delta: usd(collateral),
        price: usd(price),
    }
}

/// A long BTC increase of $5,000 on $1,000 collateral at $60,000.
#[must_use]
pub fn increase(id: &str, timestamp: u64) -> RawEvent {
    increase_with(id, timestamp, 5_000, 1_000, 60_000)
}

/// A long BTC increase with the given whole-dollar amounts.
#[must_use]
pub fn increase_with(id: &str, timestamp: u64, size: u64, collateral: u64, price: u64) -> RawEvent {
    raw(id, timestamp, EventKind::Increase(change(size, collateral, price)))
}

/// A long BTC decrease without an execution price.
#[must_use]
pub fn decrease(id: &str, timestamp: u64) -> RawEvent {
    raw(id, timestamp, EventKind::Decrease(change(2_000, 500, 0)))
}

/// A long BTC liquidation of $10,000 size on $1,000 collateral at $55,000.
#[must_use]
pub fn liquidation(id: &str, timestamp: u64, realised_pnl: I256) -> RawEvent {
    raw(
        id,
        timestamp,
        EventKind::Liquidation(Liquidation {
            collateral_token: USDC,
            index_token: BTC,
            side: Side::Long,
            size: usd(10_000),
            collateral: usd(1_000),
            mark_price: usd(55_000),
            realised_pnl,
        }),
    )
}
