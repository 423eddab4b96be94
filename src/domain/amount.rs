//! Conversions from protocol fixed-point integers to display decimals.
//!
//! USD amounts and prices are 1e30-scaled integers on chain. They are cut
//! down to 12 fractional digits before conversion so realistic values fit in
//! a [`Decimal`] mantissa.

use alloy_primitives::{I256, U256};
use rust_decimal::Decimal;

/// Number of decimals in protocol USD values.
pub const USD_DECIMALS: u32 = 30;

const KEPT_SCALE: u32 = 12;

fn pow10(exp: u32) -> U256 {
    U256::from(10u64).pow(U256::from(exp))
}

/// Convert a 1e30-scaled unsigned USD integer.
///
/// Returns `None` for values too large to represent.
#[must_use]
pub fn usd_from_raw(raw: U256) -> Option<Decimal> {
    scaled(raw, USD_DECIMALS)
}

/// Convert a 1e30-scaled signed USD integer.
#[must_use]
pub fn usd_from_signed(raw: I256) -> Option<Decimal> {
    let magnitude = usd_from_raw(raw.unsigned_abs())?;
    Some(if raw.is_negative() {
        -magnitude
    } else {
        magnitude
    })
}

/// Convert an integer with `decimals` fractional digits.
#[must_use]
pub fn scaled(raw: U256, decimals: u32) -> Option<Decimal> {
    let (value, scale) = if decimals > KEPT_SCALE {
        (raw / pow10(decimals - KEPT_SCALE), KEPT_SCALE)
    } else {
        (raw, decimals)
    };
    let value = i128::try_from(u128::try_from(value).ok()?).ok()?;
    Decimal::try_from_i128_with_scale(value, scale)
        .ok()
        .map(|d| d.normalize())
}

/// Leverage ratio `size / collateral`, `None` when collateral is zero.
#[must_use]
pub fn leverage(size: Decimal, collateral: Decimal) -> Option<Decimal> {
    if collateral.is_zero() {
        return None;
    }
    size.checked_div(collateral)
}
