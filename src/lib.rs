//! perpwatch - relay perpetuals position events to Telegram.
//!
//! Watches a GMX-style perpetuals deployment for position increases,
//! decreases and liquidations, enriches each event with position state and
//! prices, and posts one message per event to a Telegram chat.
//!
//! # Architecture
//!
//! - **`domain`** - Raw and enriched events, cursors, token metadata
//! - **`port`** - Traits for sources, cursor stores, lookups and sinks
//! - **`application`** - Watermark engine, enrichment and the delivery cycle
//! - **`adapter`** - Subgraph and chain sources, SQLite/file stores, price
//!   and vault lookups, Telegram and log sinks, and the CLI
//! - **`infrastructure`** - Configuration, wiring and the runtime loops
//!
//! # Delivery
//!
//! Every event is delivered at least once. The watermark is exclusive and
//! only moves after the sink accepted everything below it; a seen-set at the
//! boundary keeps retries and overlapping fetches from posting twice.
//!
//! # Features
//!
//! - `telegram` - Telegram sink (default)
//! - `testkit` - Test doubles for integration tests
//!
//! # Example
//!
//! ```no_run
//! use perpwatch::infrastructure::config::settings::Config;
//! use perpwatch::infrastructure::orchestration::Relay;
//!
//! # async fn run() -> perpwatch::error::Result<()> {
//! let config = Config::load("config.toml")?;
//! config.init_logging();
//! Relay::run(config).await
//! # }
//! ```

pub mod adapter;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
