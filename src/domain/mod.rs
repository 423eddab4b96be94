//! Exchange-agnostic domain types: raw events, cursors, enriched events,
//! rendered messages and token metadata.

pub mod amount;
pub mod cursor;
pub mod enriched;
pub mod event;
pub mod message;
pub mod token;

pub use cursor::{Cursor, StoreCapability, StreamName};
pub use enriched::{EnrichedEvent, Lookup, Pnl};
pub use event::{EventId, EventKind, Liquidation, PositionChange, PositionKey, RawEvent, Side};
pub use message::RenderedMessage;
pub use token::{TokenInfo, TokenRegistry};
