//! Position subgraph polling adapter.

pub mod dto;
pub mod query;
pub mod source;

pub use source::{RateLimitPolicy, SubgraphSource};
