//! Vault position reader.

use alloy_primitives::Address;
use alloy_sol_types::SolCall;
use async_trait::async_trait;

use super::abi::IVault;
use super::rpc::JsonRpcClient;
use crate::domain::PositionKey;
use crate::error::Result;
use crate::port::outbound::lookup::{PositionLookup, PositionSnapshot};

/// Reads position state with `eth_call` against the vault contract.
pub struct VaultReader {
    rpc: JsonRpcClient,
    vault: Address,
}

impl VaultReader {
    #[must_use]
    pub fn new(rpc: JsonRpcClient, vault: Address) -> Self {
        Self { rpc, vault }
    }
}

#[async_trait]
impl PositionLookup for VaultReader {
    async fn position(&self, key: &PositionKey) -> Result<Option<PositionSnapshot>> {
        let position_call = IVault::getPositionCall {
            account: key.account,
            collateralToken: key.collateral_token,
            indexToken: key.index_token,
            isLong: key.is_long,
        };
        let raw = self
            .rpc
            .eth_call(self.vault, position_call.abi_encode().into())
            .await?;
        let position = IVault::getPositionCall::abi_decode_returns(&raw)?;
        if position._0.is_zero() {
            return Ok(None);
        }

        let delta_call = IVault::getPositionDeltaCall {
            account: key.account,
            collateralToken: key.collateral_token,
            indexToken: key.index_token,
            isLong: key.is_long,
        };
        let raw = self
            .rpc
            .eth_call(self.vault, delta_call.abi_encode().into())
            .await?;
        let delta = IVault::getPositionDeltaCall::abi_decode_returns(&raw)?;

        Ok(Some(PositionSnapshot {
            size: position._0,
            collateral: position._1,
            average_price: position._2,
            has_profit: delta._0,
            delta: delta._1,
        }))
    }
}
