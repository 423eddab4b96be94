//! Minimal Vault and PositionRouter interfaces.
//!
//! The protocol emits every event parameter unindexed, so only `topic0`
//! identifies the event and all fields live in the data section.

use alloy_primitives::B256;
use alloy_sol_types::{sol, SolEvent};

sol! {
    contract IVault {
        event LiquidatePosition(
            bytes32 key,
            address account,
            address collateralToken,
            address indexToken,
            bool isLong,
            uint256 size,
            uint256 collateral,
            uint256 reserveAmount,
            int256 realisedPnl,
            uint256 markPrice
        );

        function getPosition(address account, address collateralToken, address indexToken, bool isLong)
            external view returns (uint256, uint256, uint256, uint256, uint256, uint256, bool, uint256);

        function getPositionDelta(address account, address collateralToken, address indexToken, bool isLong)
            external view returns (bool, uint256);
    }

    contract IPositionRouter {
        event ExecuteIncreasePosition(
            address account,
            address[] path,
            address indexToken,
            uint256 amountIn,
            uint256 minOut,
            uint256 sizeDelta,
            bool isLong,
            uint256 acceptablePrice,
            uint256 executionFee,
            uint256 blockGap,
            uint256 timeGap
        );

        event ExecuteDecreasePosition(
            address account,
            address[] path,
            address indexToken,
            uint256 collateralDelta,
            uint256 sizeDelta,
            bool isLong,
            address receiver,
            uint256 acceptablePrice,
            uint256 minOut,
            uint256 executionFee,
            uint256 blockGap,
            uint256 timeGap
        );
    }
}

/// `topic0` values of every event the relay subscribes to.
#[must_use]
pub fn watched_topics() -> [B256; 3] {
    [
        IVault::LiquidatePosition::SIGNATURE_HASH,
        IPositionRouter::ExecuteIncreasePosition::SIGNATURE_HASH,
        IPositionRouter::ExecuteDecreasePosition::SIGNATURE_HASH,
    ]
}
