//! Source wrappers.

pub mod reconnecting;

pub use reconnecting::ReconnectingStream;
