//! Spot price adapters.

pub mod ticker;

pub use ticker::TickerPriceClient;
