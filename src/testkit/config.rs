//! Canonical test configurations.
//!
//! Single source of truth for config structs used across tests.

use crate::infrastructure::config::reconnection::ReconnectionConfig;
use crate::infrastructure::config::settings::Config;
use crate::infrastructure::config::source::SourceKind;
use crate::infrastructure::config::store::StoreBackend;
use crate::infrastructure::config::notifier::SinkKind;

/// Fast reconnection config with near-zero delays.
#[must_use]
pub fn reconnection() -> ReconnectionConfig {
    ReconnectionConfig {
        initial_delay_ms: 1,
        max_delay_ms: 1,
        backoff_multiplier: 1.0,
        max_consecutive_failures: 3,
        circuit_breaker_cooldown_ms: 1,
    }
}

/// A valid subgraph config with an in-memory store and the log sink.
#[must_use]
pub fn subgraph(url: &str) -> Config {
    let mut config = Config::default();
    config.source.kind = SourceKind::Subgraph;
    config.source.subgraph_url = Some(url.to_string());
    config.store.backend = StoreBackend::Memory;
    config.notifier.sink = SinkKind::Log;
    config.reconnection = reconnection();
    config
}
