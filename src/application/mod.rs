//! Application services (use cases).
//!
//! These services run the event-to-notification cycle: watermark decisions,
//! enrichment, and the cycle that ties them to a sink.

pub mod cache;
pub mod enrich;
pub mod pipeline;
pub mod watermark;

pub use enrich::Enricher;
pub use pipeline::{CycleReport, Pipeline};
pub use watermark::{CycleProgress, Verdict, WatermarkEngine};
