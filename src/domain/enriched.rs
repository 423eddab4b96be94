//! Events augmented with derived and looked-up display fields.

use rust_decimal::Decimal;

use super::event::RawEvent;

/// A derived field that may be unavailable.
///
/// Lookups never fail past the enrichment stage; a failed or missing lookup
/// becomes [`Lookup::Unknown`] and renders as a placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lookup<T> {
    Known(T),
    #[default]
    Unknown,
}

impl<T> Lookup<T> {
    #[must_use]
    pub fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }

    /// Borrow the value if known.
    #[must_use]
    pub fn known(&self) -> Option<&T> {
        match self {
            Self::Known(v) => Some(v),
            Self::Unknown => None,
        }
    }

    /// Fall back to `other` when this value is unknown.
    #[must_use]
    pub fn or(self, other: Lookup<T>) -> Lookup<T> {
        match self {
            Self::Known(_) => self,
            Self::Unknown => other,
        }
    }
}

impl<T> From<Option<T>> for Lookup<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Unknown, Self::Known)
    }
}

/// Profit or loss in USD; negative values are losses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pnl(pub Decimal);

impl Pnl {
    #[must_use]
    pub fn is_profit(&self) -> bool {
        !self.0.is_sign_negative() || self.0.is_zero()
    }

    #[must_use]
    pub fn magnitude(&self) -> Decimal {
        self.0.abs()
    }
}

/// A [`RawEvent`] together with display-ready fields.
///
/// Exists only for one pipeline pass and is never persisted.
#[derive(Debug, Clone)]
pub struct EnrichedEvent {
    pub raw: RawEvent,
    /// Symbol of the traded index token.
    pub symbol: String,
    /// Position size in USD (after the event for increase/decrease).
    pub size_usd: Lookup<Decimal>,
    pub collateral_usd: Lookup<Decimal>,
    pub leverage: Lookup<Decimal>,
    pub entry_price: Lookup<Decimal>,
    pub mark_price: Lookup<Decimal>,
    pub pnl: Lookup<Pnl>,
}

impl EnrichedEvent {
    /// An event with every derived field unknown.
    #[must_use]
    pub fn bare(raw: RawEvent, symbol: impl Into<String>) -> Self {
        Self {
            raw,
            symbol: symbol.into(),
            size_usd: Lookup::Unknown,
            collateral_usd: Lookup::Unknown,
            leverage: Lookup::Unknown,
            entry_price: Lookup::Unknown,
            mark_price: Lookup::Unknown,
            pnl: Lookup::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn lookup_or_prefers_known() {
        let a: Lookup<u8> = Lookup::Known(1);
        assert_eq!(a.or(Lookup::Known(2)), Lookup::Known(1));
        assert_eq!(Lookup::Unknown.or(Lookup::Known(2)), Lookup::Known(2));
    }

    #[test]
    fn lookup_from_option() {
        assert_eq!(Lookup::from(Some(3)), Lookup::Known(3));
        assert_eq!(Lookup::<u8>::from(None), Lookup::Unknown);
    }

    #[test]
    fn pnl_sign() {
        assert!(Pnl(dec!(10)).is_profit());
        assert!(Pnl(Decimal::ZERO).is_profit());
        assert!(!Pnl(dec!(-3.5)).is_profit());
        assert_eq!(Pnl(dec!(-3.5)).magnitude(), dec!(3.5));
    }
}
