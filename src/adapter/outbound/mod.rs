//! Outbound adapters (driven side).

pub mod chain;
pub mod notifier;
pub mod price;
pub mod store;
pub mod subgraph;
