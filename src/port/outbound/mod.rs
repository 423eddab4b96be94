//! Outbound ports: what the pipeline needs from the outside world.

pub mod cursor;
pub mod lookup;
pub mod notifier;
pub mod source;

pub use cursor::CursorStore;
pub use lookup::{PositionLookup, PositionSnapshot, PriceLookup};
pub use notifier::Notifier;
pub use source::{EventStream, PollRequest, PollingSource, SourceBatch, StreamEvent};
