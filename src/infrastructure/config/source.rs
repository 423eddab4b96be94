//! Event source configuration.

use alloy_primitives::{address, Address};
use serde::Deserialize;

/// Which source feeds the pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Poll a position subgraph.
    #[default]
    Subgraph,
    /// Subscribe to vault and router logs over WebSocket.
    Chain,
}

impl SourceKind {
    /// Cursor stream name for this source.
    #[must_use]
    pub const fn stream_name(self) -> &'static str {
        match self {
            Self::Subgraph => "subgraph",
            Self::Chain => "chain",
        }
    }
}

/// Source endpoints and pacing.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub kind: SourceKind,

    /// GraphQL endpoint (subgraph source).
    #[serde(default)]
    pub subgraph_url: Option<String>,
    /// WebSocket JSON-RPC endpoint (chain source).
    #[serde(default)]
    pub ws_url: Option<String>,
    /// HTTP JSON-RPC endpoint used for vault position reads.
    #[serde(default)]
    pub rpc_url: Option<String>,

    #[serde(default = "default_vault_address")]
    pub vault_address: Address,
    #[serde(default = "default_router_address")]
    pub router_address: Address,

    /// Seconds between polling cycles.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Events requested per kind on each page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Upper bound when the page size grows to get past a crowded timestamp.
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,
    /// Pages fetched back to back within one tick while catching up.
    #[serde(default = "default_max_pages_per_cycle")]
    pub max_pages_per_cycle: u32,
    /// HTTP request timeout for subgraph and RPC calls (milliseconds).
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_max_rate_limit_retries")]
    pub max_rate_limit_retries: u32,
    /// Wait after HTTP 429 without `Retry-After` (milliseconds).
    #[serde(default = "default_rate_limit_default_wait_ms")]
    pub rate_limit_default_wait_ms: u64,

    /// Quiet period that closes a subscription batch (milliseconds).
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    /// Maximum events per subscription batch.
    #[serde(default = "default_max_batch")]
    pub max_batch: usize,
    /// Capacity of the subscription event channel.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    /// Delay before failed subscription deliveries are retried when no new
    /// events arrive (milliseconds).
    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,
    #[serde(default = "default_probe_interval_secs")]
    pub probe_interval_secs: u64,
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,

    /// Initial watermark when the store holds none.
    #[serde(default)]
    pub start_from: Option<u64>,
}

// MoneyX deployment on BNB chain.
fn default_vault_address() -> Address {
    address!("eB0E5E1a8500317A1B8fDd195097D5509Ef861de")
}

fn default_router_address() -> Address {
    address!("065F9746b33F303c6481549BAc42A3885903fA44")
}

const fn default_poll_interval_secs() -> u64 {
    15
}

const fn default_page_size() -> usize {
    100
}

const fn default_max_page_size() -> usize {
    1000
}

const fn default_max_pages_per_cycle() -> u32 {
    10
}

const fn default_request_timeout_ms() -> u64 {
    10_000
}

const fn default_max_rate_limit_retries() -> u32 {
    3
}

const fn default_rate_limit_default_wait_ms() -> u64 {
    5000
}

const fn default_settle_ms() -> u64 {
    500
}

const fn default_max_batch() -> usize {
    100
}

const fn default_channel_capacity() -> usize {
    1024
}

const fn default_retry_interval_ms() -> u64 {
    5000
}

const fn default_probe_interval_secs() -> u64 {
    30
}

const fn default_probe_timeout_secs() -> u64 {
    10
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::default(),
            subgraph_url: None,
            ws_url: None,
            rpc_url: None,
            vault_address: default_vault_address(),
            router_address: default_router_address(),
            poll_interval_secs: default_poll_interval_secs(),
            page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            max_pages_per_cycle: default_max_pages_per_cycle(),
            request_timeout_ms: default_request_timeout_ms(),
            max_rate_limit_retries: default_max_rate_limit_retries(),
            rate_limit_default_wait_ms: default_rate_limit_default_wait_ms(),
            settle_ms: default_settle_ms(),
            max_batch: default_max_batch(),
            channel_capacity: default_channel_capacity(),
            retry_interval_ms: default_retry_interval_ms(),
            probe_interval_secs: default_probe_interval_secs(),
            probe_timeout_secs: default_probe_timeout_secs(),
            start_from: None,
        }
    }
}
