//! Port definitions (hexagonal architecture).
//!
//! Ports are the traits the application layer depends on; the adapter layer
//! implements them.

pub mod outbound;

pub use outbound::{
    CursorStore, EventStream, Notifier, PollRequest, PollingSource, PositionLookup,
    PositionSnapshot, PriceLookup, SourceBatch, StreamEvent,
};
