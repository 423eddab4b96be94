//! Enrichment and rendering configuration.

use alloy_primitives::Address;
use serde::Deserialize;

use crate::adapter::outbound::notifier::format::DEFAULT_EXPLORER_URL;
use crate::domain::{TokenInfo, TokenRegistry};

/// A token entry added on top of the built-in registry.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenEntry {
    pub address: Address,
    pub symbol: String,
    #[serde(default = "default_decimals")]
    pub decimals: u8,
}

const fn default_decimals() -> u8 {
    18
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnrichmentConfig {
    /// Read position state from the vault (needs `source.rpc_url`).
    #[serde(default = "default_true")]
    pub positions: bool,
    /// Base URL of a Binance-compatible ticker API. Prices are not looked
    /// up when unset.
    #[serde(default)]
    pub price_url: Option<String>,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_explorer_url")]
    pub explorer_url: String,
    #[serde(default)]
    pub tokens: Vec<TokenEntry>,
}

const fn default_true() -> bool {
    true
}

const fn default_cache_ttl_secs() -> u64 {
    60
}

fn default_explorer_url() -> String {
    DEFAULT_EXPLORER_URL.into()
}

impl EnrichmentConfig {
    /// Built-in registry with configured tokens applied on top.
    #[must_use]
    pub fn token_registry(&self) -> TokenRegistry {
        let mut registry = TokenRegistry::bnb_defaults();
        for token in &self.tokens {
            registry.insert(TokenInfo::new(token.address, &token.symbol, token.decimals));
        }
        registry
    }
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            positions: default_true(),
            price_url: None,
            cache_ttl_secs: default_cache_ttl_secs(),
            explorer_url: default_explorer_url(),
            tokens: Vec::new(),
        }
    }
}
