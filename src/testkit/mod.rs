//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`domain`] - Builders for raw events and 1e30-scaled amounts.
//! - [`source`] - Scripted [`PollingSource`](crate::port::outbound::source::PollingSource)
//!   and [`EventStream`](crate::port::outbound::source::EventStream) doubles.
//! - [`notifier`] - A recording sink with scriptable failures.
//! - [`lookup`] - Static and failing enrichment lookups.
//! - [`config`] - Canonical test configurations.

pub mod config;
pub mod domain;
pub mod lookup;
pub mod notifier;
pub mod source;
