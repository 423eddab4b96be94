//! Runtime orchestration.
//!
//! Drives the pipeline from either source shape until shutdown.

pub mod poll;
pub mod relay;
pub mod stream;

pub use relay::Relay;
