//! Token metadata used to name traded pairs.

use std::collections::HashMap;

use alloy_primitives::{address, Address};

/// Symbol used for tokens missing from the registry.
pub const UNKNOWN_SYMBOL: &str = "UNKNOWN";

/// Metadata for a single token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenInfo {
    pub address: Address,
    pub symbol: String,
    pub decimals: u8,
}

impl TokenInfo {
    pub fn new(address: Address, symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            address,
            symbol: symbol.into(),
            decimals,
        }
    }
}

/// Address-keyed token lookup.
#[derive(Debug, Clone, Default)]
pub struct TokenRegistry {
    tokens: HashMap<Address, TokenInfo>,
}

impl TokenRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the BNB chain tokens listed by the MoneyX vault.
    #[must_use]
    pub fn bnb_defaults() -> Self {
        let mut registry = Self::new();
        for (addr, symbol, decimals) in [
            (address!("4fFe5ec4D8B9822e01c9E49678884bAEc17F60D9"), "MONEY", 18),
            (address!("4925C7e05347d90A3c7e07f8D8b3A52FaAC91bCb"), "USDG", 18),
            (address!("7130d2A12B9BCbFAe4f2634d864A1Ee1Ce3Ead9c"), "BTC", 18),
            (address!("2170Ed0880ac9A755fd29B2688956BD959F933F8"), "ETH", 18),
            (address!("bb4CdB9CBd36B01bD1cBaEBF2De08d9173bc095c"), "BNB", 18),
            (address!("ba2ae424d960c26247dd6c32edc70b295c744c43"), "DOGE", 8),
            (address!("1D2F0da169ceB9fC7B3144628dB156f3F6c60dBE"), "XRP", 18),
            (address!("8ac76a51cc950d9822d68b83fe1ad97b32cd580d"), "USDC", 18),
        ] {
            registry.insert(TokenInfo::new(addr, symbol, decimals));
        }
        registry
    }

    /// Add or replace a token.
    pub fn insert(&mut self, token: TokenInfo) {
        self.tokens.insert(token.address, token);
    }

    #[must_use]
    pub fn get(&self, address: &Address) -> Option<&TokenInfo> {
        self.tokens.get(address)
    }

    /// Symbol for `address`, or [`UNKNOWN_SYMBOL`].
    #[must_use]
    pub fn symbol(&self, address: &Address) -> &str {
        self.get(address)
            .map_or(UNKNOWN_SYMBOL, |token| token.symbol.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_resolve_symbols_case_insensitively() {
        let registry = TokenRegistry::bnb_defaults();
        let btc: Address = "0x7130d2a12b9bcbfae4f2634d864a1ee1ce3ead9c".parse().unwrap();
        assert_eq!(registry.symbol(&btc), "BTC");
        assert_eq!(registry.len(), 8);
    }

    #[test]
    fn unknown_address_uses_placeholder_symbol() {
        let registry = TokenRegistry::bnb_defaults();
        assert_eq!(registry.symbol(&Address::ZERO), UNKNOWN_SYMBOL);
    }

    #[test]
    fn insert_replaces_existing() {
        let mut registry = TokenRegistry::new();
        registry.insert(TokenInfo::new(Address::ZERO, "OLD", 18));
        registry.insert(TokenInfo::new(Address::ZERO, "NEW", 6));
        assert_eq!(registry.symbol(&Address::ZERO), "NEW");
        assert_eq!(registry.get(&Address::ZERO).unwrap().decimals, 6);
    }
}
