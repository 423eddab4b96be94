//! Spot price lookup against a Binance-compatible ticker endpoint.

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::trace;

use crate::error::{Result, SourceError};
use crate::port::outbound::lookup::PriceLookup;

/// Symbols priced at one dollar without a request.
const STABLECOINS: &[&str] = &["USDC", "USDT", "USDG", "BUSD", "DAI"];

#[derive(Debug, Deserialize)]
struct TickerPrice {
    price: Decimal,
}

/// Resolves `{SYMBOL}` to a USD price via `GET {base}/api/v3/ticker/price?symbol={SYMBOL}{quote}`.
pub struct TickerPriceClient {
    client: reqwest::Client,
    base_url: String,
    quote: String,
}

impl TickerPriceClient {
    /// Create a client quoting against `USDT`.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            quote: "USDT".into(),
        })
    }

    #[must_use]
    pub fn with_quote(mut self, quote: impl Into<String>) -> Self {
        self.quote = quote.into();
        self
    }

    /// Ticker URL for `symbol`.
    #[must_use]
    pub fn ticker_url(&self, symbol: &str) -> String {
        format!(
            "{}/api/v3/ticker/price?symbol={}{}",
            self.base_url,
            symbol.to_ascii_uppercase(),
            self.quote
        )
    }
}

#[async_trait]
impl PriceLookup for TickerPriceClient {
    async fn price_usd(&self, symbol: &str) -> Result<Decimal> {
        if is_stablecoin(symbol) {
            return Ok(Decimal::ONE);
        }
        let url = self.ticker_url(symbol);
        trace!(url = %url, "Fetching ticker price");

        let ticker: TickerPrice = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        if ticker.price.is_sign_negative() || ticker.price.is_zero() {
            return Err(SourceError::Malformed(format!("non-positive price for {symbol}")).into());
        }
        Ok(ticker.price)
    }
}

fn is_stablecoin(symbol: &str) -> bool {
    STABLECOINS.iter().any(|s| s.eq_ignore_ascii_case(symbol))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn client() -> TickerPriceClient {
        TickerPriceClient::new("https://api.binance.com/", Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn builds_ticker_url() {
        assert_eq!(
            client().ticker_url("btc"),
            "https://api.binance.com/api/v3/ticker/price?symbol=BTCUSDT"
        );
        assert_eq!(
            client().with_quote("FDUSD").ticker_url("ETH"),
            "https://api.binance.com/api/v3/ticker/price?symbol=ETHFDUSD"
        );
    }

    #[test]
    fn parses_string_price() {
        let ticker: TickerPrice =
            serde_json::from_str(r#"{"symbol":"BTCUSDT","price":"60123.45000000"}"#).unwrap();
        assert_eq!(ticker.price, dec!(60123.45));
    }

    #[tokio::test]
    async fn stablecoins_skip_the_network() {
        let client = TickerPriceClient::new("http://127.0.0.1:9", Duration::from_millis(50)).unwrap();
        assert_eq!(client.price_usd("usdc").await.unwrap(), Decimal::ONE);
        assert!(client.price_usd("BTC").await.is_err());
    }
}
