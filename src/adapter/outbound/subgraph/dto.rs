//! Subgraph response types.
//!
//! Subgraphs serialise `BigInt` fields as decimal strings and `Int` fields
//! as numbers (some deployments also stringify those), so numeric fields go
//! through the lenient helpers in [`de`].

use alloy_primitives::{Address, I256, U256};
use serde::Deserialize;

use crate::domain::{EventId, EventKind, Liquidation, PositionChange, RawEvent, Side};

/// GraphQL response envelope.
#[derive(Debug, Deserialize)]
pub struct GraphQlResponse {
    #[serde(default)]
    pub data: Option<PositionsData>,
    #[serde(default)]
    pub errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlError {
    pub message: String,
}

/// The three aliased position queries.
#[derive(Debug, Deserialize)]
pub struct PositionsData {
    pub increases: Vec<PositionChangeEntity>,
    pub decreases: Vec<PositionChangeEntity>,
    pub liquidations: Vec<LiquidationEntity>,
}

/// `IncreasePosition` / `DecreasePosition` entity.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionChangeEntity {
    pub id: String,
    pub account: Address,
    pub collateral_token: Address,
    pub index_token: Address,
    #[serde(deserialize_with = "de::u256")]
    pub collateral_delta: U256,
    #[serde(deserialize_with = "de::u256")]
    pub size_delta: U256,
    pub is_long: bool,
    #[serde(deserialize_with = "de::u256")]
    pub price: U256,
    #[serde(deserialize_with = "de::u64")]
    pub timestamp: u64,
}

/// `LiquidatedPosition` entity.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidationEntity {
    pub id: String,
    pub account: Address,
    pub collateral_token: Address,
    pub index_token: Address,
    pub is_long: bool,
    #[serde(deserialize_with = "de::u256")]
    pub size: U256,
    #[serde(deserialize_with = "de::u256")]
    pub collateral: U256,
    #[serde(deserialize_with = "de::u256")]
    pub mark_price: U256,
    #[serde(deserialize_with = "de::i256")]
    pub realised_pnl: I256,
    #[serde(deserialize_with = "de::u64")]
    pub timestamp: u64,
}

/// Entity ids are `{tx_hash}:{log_index}` on the common position subgraphs.
fn tx_hash_from_id(id: &str) -> Option<String> {
    let (hash, _) = id.split_once(':')?;
    let is_hash = hash.len() == 66
        && hash.starts_with("0x")
        && hash[2..].chars().all(|c| c.is_ascii_hexdigit());
    is_hash.then(|| hash.to_string())
}

impl PositionChangeEntity {
    fn change(&self) -> PositionChange {
        PositionChange {
            collateral_token: self.collateral_token,
            index_token: self.index_token,
            side: Side::from_is_long(self.is_long),
            size_delta: self.size_delta,
            collateral_delta: self.collateral_delta,
            price: self.price,
        }
    }

    #[must_use]
    pub fn into_increase(self) -> RawEvent {
        let kind = EventKind::Increase(self.change());
        self.into_raw(kind)
    }

    #[must_use]
    pub fn into_decrease(self) -> RawEvent {
        let kind = EventKind::Decrease(self.change());
        self.into_raw(kind)
    }

    fn into_raw(self, kind: EventKind) -> RawEvent {
        RawEvent {
            tx_hash: tx_hash_from_id(&self.id),
            id: EventId::new(self.id),
            timestamp: self.timestamp,
            account: self.account,
            kind,
        }
    }
}

impl From<LiquidationEntity> for RawEvent {
    fn from(entity: LiquidationEntity) -> Self {
        let kind = EventKind::Liquidation(Liquidation {
            collateral_token: entity.collateral_token,
            index_token: entity.index_token,
            side: Side::from_is_long(entity.is_long),
            size: entity.size,
            collateral: entity.collateral,
            mark_price: entity.mark_price,
            realised_pnl: entity.realised_pnl,
        });
        RawEvent {
            tx_hash: tx_hash_from_id(&entity.id),
            id: EventId::new(entity.id),
            timestamp: entity.timestamp,
            account: entity.account,
            kind,
        }
    }
}

mod de {
    use std::str::FromStr;

    use alloy_primitives::{I256, U256};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(u64),
        String(String),
    }

    pub fn u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        match NumberOrString::deserialize(deserializer)? {
            NumberOrString::Number(n) => Ok(n),
            NumberOrString::String(s) => s.parse().map_err(D::Error::custom),
        }
    }

    pub fn u256<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        match NumberOrString::deserialize(deserializer)? {
            NumberOrString::Number(n) => Ok(U256::from(n)),
            NumberOrString::String(s) => U256::from_str(&s).map_err(D::Error::custom),
        }
    }

    pub fn i256<'de, D: Deserializer<'de>>(deserializer: D) -> Result<I256, D::Error> {
        let s = String::deserialize(deserializer)?;
        I256::from_dec_str(&s).map_err(D::Error::custom)
    }
}
