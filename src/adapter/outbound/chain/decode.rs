//! Conversion of raw chain logs into [`RawEvent`]s.

use alloy_primitives::LogData;
use alloy_sol_types::SolEvent;

use super::abi::{IPositionRouter, IVault};
use super::dto::RpcLog;
use crate::domain::{EventId, EventKind, Liquidation, PositionChange, RawEvent, Side};
use crate::error::{Result, SourceError};

/// Decode a subscribed log.
///
/// Returns `Ok(None)` for logs whose `topic0` is not one of the watched
/// events.
///
/// # Errors
///
/// Returns an error when the log lacks block or transaction coordinates or
/// its data does not match the event ABI.
pub fn decode_log(log: &RpcLog) -> Result<Option<RawEvent>> {
    let Some(topic0) = log.topics.first().copied() else {
        return Ok(None);
    };

    let block = log
        .block_number
        .ok_or_else(|| SourceError::Malformed("log without blockNumber".into()))?;
    let tx_hash = log
        .transaction_hash
        .ok_or_else(|| SourceError::Malformed("log without transactionHash".into()))?;
    let log_index = log
        .log_index
        .ok_or_else(|| SourceError::Malformed("log without logIndex".into()))?;

    let data = LogData::new(log.topics.clone(), log.data.clone())
        .ok_or_else(|| SourceError::Malformed("too many topics".into()))?;

    let (account, kind) = if topic0 == IPositionRouter::ExecuteIncreasePosition::SIGNATURE_HASH {
        let ev = IPositionRouter::ExecuteIncreasePosition::decode_log_data(&data)?;
        // Collateral ends up in the last token of the swap path.
        let collateral_token = ev.path.last().copied().unwrap_or(ev.indexToken);
        let change = PositionChange {
            collateral_token,
            index_token: ev.indexToken,
            side: Side::from_is_long(ev.isLong),
            size_delta: ev.sizeDelta,
            // amountIn is denominated in the input token, not USD.
            collateral_delta: alloy_primitives::U256::ZERO,
            price: ev.acceptablePrice,
        };
        (ev.account, EventKind::Increase(change))
    } else if topic0 == IPositionRouter::ExecuteDecreasePosition::SIGNATURE_HASH {
        let ev = IPositionRouter::ExecuteDecreasePosition::decode_log_data(&data)?;
        let collateral_token = ev.path.first().copied().unwrap_or(ev.indexToken);
        let change = PositionChange {
            collateral_token,
            index_token: ev.indexToken,
            side: Side::from_is_long(ev.isLong),
            size_delta: ev.sizeDelta,
            collateral_delta: ev.collateralDelta,
            price: ev.acceptablePrice,
        };
        (ev.account, EventKind::Decrease(change))
    } else if topic0 == IVault::LiquidatePosition::SIGNATURE_HASH {
        let ev = IVault::LiquidatePosition::decode_log_data(&data)?;
        let liquidation = Liquidation {
            collateral_token: ev.collateralToken,
            index_token: ev.indexToken,
            side: Side::from_is_long(ev.isLong),
            size: ev.size,
            collateral: ev.collateral,
            mark_price: ev.markPrice,
            realised_pnl: ev.realisedPnl,
        };
        (ev.account, EventKind::Liquidation(liquidation))
    } else {
        return Ok(None);
    };

    let tx = format!("{tx_hash:#x}");
    Ok(Some(RawEvent {
        id: EventId::new(format!("{tx}:{}", log_index.to::<u64>())),
        timestamp: block.to::<u64>(),
        account,
        tx_hash: Some(tx),
        kind,
    }))
}
