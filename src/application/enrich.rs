//! Enrichment of raw events with position state and prices.
//!
//! Enrichment never fails: every lookup that errors or is not configured
//! leaves its field as [`Lookup::Unknown`] and the message renders with a
//! placeholder instead.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tracing::{debug, warn};

use super::cache::TtlCache;
use crate::domain::amount::{leverage, usd_from_raw, usd_from_signed};
use crate::domain::token::UNKNOWN_SYMBOL;
use crate::domain::{
    EnrichedEvent, EventKind, Liquidation, Lookup, Pnl, PositionChange, PositionKey, RawEvent,
    TokenRegistry,
};
use crate::port::outbound::lookup::{PositionLookup, PositionSnapshot, PriceLookup};

const CACHE_CAPACITY: usize = 4096;

/// Turns [`RawEvent`]s into display-ready [`EnrichedEvent`]s.
pub struct Enricher {
    tokens: TokenRegistry,
    positions: Option<Arc<dyn PositionLookup>>,
    prices: Option<Arc<dyn PriceLookup>>,
    position_cache: TtlCache<(PositionKey, u64), Option<PositionSnapshot>>,
    price_cache: TtlCache<String, Decimal>,
}

impl Enricher {
    /// Create an enricher with no remote lookups.
    #[must_use]
    pub fn new(tokens: TokenRegistry, cache_ttl: Duration) -> Self {
        Self {
            tokens,
            positions: None,
            prices: None,
            position_cache: TtlCache::new(cache_ttl, CACHE_CAPACITY),
            price_cache: TtlCache::new(cache_ttl, CACHE_CAPACITY),
        }
    }

    #[must_use]
    pub fn with_positions(mut self, lookup: Arc<dyn PositionLookup>) -> Self {
        self.positions = Some(lookup);
        self
    }

    #[must_use]
    pub fn with_prices(mut self, lookup: Arc<dyn PriceLookup>) -> Self {
        self.prices = Some(lookup);
        self
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenRegistry {
        &self.tokens
    }

    /// Derive every display field for `raw`.
    pub async fn enrich(&self, raw: &RawEvent) -> EnrichedEvent {
        let symbol = self.tokens.symbol(&raw.kind.index_token()).to_string();
        let mut enriched = EnrichedEvent::bare(raw.clone(), symbol);

        match &raw.kind {
            EventKind::Increase(change) | EventKind::Decrease(change) => {
                let snapshot = self.snapshot(raw).await;
                apply_change(&mut enriched, change, snapshot.as_ref());
                enriched.mark_price = match nonzero_usd(change.price) {
                    Lookup::Known(price) => Lookup::Known(price),
                    Lookup::Unknown => self.price(&enriched.symbol).await,
                };
            }
            EventKind::Liquidation(liquidation) => {
                apply_liquidation(&mut enriched, liquidation);
                if !enriched.mark_price.is_known() {
                    enriched.mark_price = self.price(&enriched.symbol).await;
                }
            }
        }

        enriched
    }

    async fn snapshot(&self, raw: &RawEvent) -> Option<PositionSnapshot> {
        let lookup = self.positions.as_ref()?;
        let key = raw.position_key();
        let result = self
            .position_cache
            .get_or_try_insert_with((key, raw.timestamp), || lookup.position(&key))
            .await;
        match result {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, event_id = %raw.id, "Position lookup failed");
                None
            }
        }
    }

    async fn price(&self, symbol: &str) -> Lookup<Decimal> {
        let Some(lookup) = self.prices.as_ref() else {
            return Lookup::Unknown;
        };
        if symbol == UNKNOWN_SYMBOL {
            return Lookup::Unknown;
        }
        let result = self
            .price_cache
            .get_or_try_insert_with(symbol.to_string(), || lookup.price_usd(symbol))
            .await;
        match result {
            Ok(price) => Lookup::Known(price),
            Err(e) => {
                debug!(error = %e, symbol, "Price lookup failed");
                Lookup::Unknown
            }
        }
    }
}

fn nonzero_usd(raw: alloy_primitives::U256) -> Lookup<Decimal> {
    if raw.is_zero() {
        return Lookup::Unknown;
    }
    usd_from_raw(raw).into()
}

fn apply_change(
    enriched: &mut EnrichedEvent,
    change: &PositionChange,
    snapshot: Option<&PositionSnapshot>,
) {
    match snapshot {
        Some(position) => {
            enriched.size_usd = usd_from_raw(position.size).into();
            enriched.collateral_usd = usd_from_raw(position.collateral).into();
            enriched.entry_price = nonzero_usd(position.average_price);
            enriched.pnl = usd_from_raw(position.delta)
                .map(|delta| Pnl(if position.has_profit { delta } else { -delta }))
                .into();
        }
        // Zero deltas mean the source did not report the amount in USD.
        None => {
            enriched.size_usd = nonzero_usd(change.size_delta);
            enriched.collateral_usd = nonzero_usd(change.collateral_delta);
        }
    }
    enriched.leverage = derive_leverage(enriched);
}

fn apply_liquidation(enriched: &mut EnrichedEvent, liquidation: &Liquidation) {
    enriched.size_usd = usd_from_raw(liquidation.size).into();
    enriched.collateral_usd = usd_from_raw(liquidation.collateral).into();
    enriched.mark_price = nonzero_usd(liquidation.mark_price);
    enriched.pnl = usd_from_signed(liquidation.realised_pnl).map(Pnl).into();
    enriched.leverage = derive_leverage(enriched);
}

fn derive_leverage(enriched: &EnrichedEvent) -> Lookup<Decimal> {
    match (enriched.size_usd.known(), enriched.collateral_usd.known()) {
        (Some(size), Some(collateral)) => leverage(*size, *collateral).into(),
        _ => Lookup::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::domain::{self as fixtures, usd};
    use crate::testkit::lookup::{FailingPrices, StaticPositions, StaticPrices};
    use alloy_primitives::I256;
    use rust_decimal_macros::dec;

    fn enricher() -> Enricher {
        Enricher::new(TokenRegistry::bnb_defaults(), Duration::from_secs(60))
    }

    #[tokio::test]
    async fn uses_event_amounts_without_lookups() {
        let raw = fixtures::increase_with("a", 1000, 5_000, 1_000, 60_000);
        let enriched = enricher().enrich(&raw).await;

        assert_eq!(enriched.symbol, "BTC");
        assert_eq!(enriched.size_usd, Lookup::Known(dec!(5000)));
        assert_eq!(enriched.collateral_usd, Lookup::Known(dec!(1000)));
        assert_eq!(enriched.leverage, Lookup::Known(dec!(5)));
        assert_eq!(enriched.mark_price, Lookup::Known(dec!(60000)));
        assert_eq!(enriched.entry_price, Lookup::Unknown);
        assert_eq!(enriched.pnl, Lookup::Unknown);
    }

    #[tokio::test]
    async fn prefers_position_snapshot() {
        let raw = fixtures::increase_with("a", 1000, 5_000, 1_000, 60_000);
        let positions = StaticPositions::new(Some(PositionSnapshot {
            size: usd(20_000),
            collateral: usd(2_000),
            average_price: usd(58_000),
            has_profit: false,
            delta: usd(150),
        }));
        let enriched = enricher()
            .with_positions(Arc::new(positions))
            .enrich(&raw)
            .await;

        assert_eq!(enriched.size_usd, Lookup::Known(dec!(20000)));
        assert_eq!(enriched.leverage, Lookup::Known(dec!(10)));
        assert_eq!(enriched.entry_price, Lookup::Known(dec!(58000)));
        assert_eq!(enriched.pnl, Lookup::Known(Pnl(dec!(-150))));
    }

    #[tokio::test]
    async fn failed_position_lookup_falls_back() {
        let raw = fixtures::increase_with("a", 1000, 5_000, 1_000, 0);
        let enriched = enricher()
            .with_positions(Arc::new(StaticPositions::failing()))
            .enrich(&raw)
            .await;

        assert_eq!(enriched.size_usd, Lookup::Known(dec!(5000)));
        assert_eq!(enriched.mark_price, Lookup::Unknown);
    }

    #[tokio::test]
    async fn missing_price_uses_lookup() {
        let raw = fixtures::increase_with("a", 1000, 5_000, 1_000, 0);
        let enriched = enricher()
            .with_prices(Arc::new(StaticPrices::new(dec!(61000.5))))
            .enrich(&raw)
            .await;

        assert_eq!(enriched.mark_price, Lookup::Known(dec!(61000.5)));
    }

    #[tokio::test]
    async fn price_failure_renders_unknown() {
        let raw = fixtures::increase_with("a", 1000, 5_000, 1_000, 0);
        let enriched = enricher()
            .with_prices(Arc::new(FailingPrices))
            .enrich(&raw)
            .await;

        assert_eq!(enriched.mark_price, Lookup::Unknown);
        assert_eq!(enriched.size_usd, Lookup::Known(dec!(5000)));
    }

    #[tokio::test]
    async fn liquidation_reports_realised_loss() {
        let raw = fixtures::liquidation("l", 1000, I256::try_from(usd(900)).unwrap().wrapping_neg());
        let enriched = enricher().enrich(&raw).await;

        assert_eq!(enriched.pnl, Lookup::Known(Pnl(dec!(-900))));
        assert_eq!(enriched.size_usd, Lookup::Known(dec!(10000)));
        assert_eq!(enriched.collateral_usd, Lookup::Known(dec!(1000)));
        assert_eq!(enriched.leverage, Lookup::Known(dec!(10)));
    }

    #[tokio::test]
    async fn position_lookups_are_cached_per_event() {
        let raw = fixtures::increase_with("a", 1000, 5_000, 1_000, 1);
        let positions = Arc::new(StaticPositions::new(None));
        let enricher = enricher().with_positions(positions.clone());

        enricher.enrich(&raw).await;
        enricher.enrich(&raw).await;

        assert_eq!(positions.calls(), 1);
    }
}
