//! Minimal HTTP JSON-RPC client.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use alloy_primitives::{Address, Bytes};
use serde_json::{json, Value};
use tracing::trace;

use super::dto::{request, RpcEnvelope};
use crate::error::{Error, Result, SourceError};

/// JSON-RPC client over HTTP POST.
pub struct JsonRpcClient {
    client: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    /// Create a client with the given request timeout.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
            next_id: AtomicU64::new(1),
        })
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Invoke `method` and return the raw `result` value.
    ///
    /// # Errors
    /// Returns an error for transport failures, JSON-RPC errors and responses
    /// without a result.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        trace!(method, id, "JSON-RPC call");

        let envelope: RpcEnvelope = self
            .client
            .post(&self.url)
            .json(&request(id, method, params))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(err) = envelope.error {
            return Err(SourceError::from(err).into());
        }
        envelope
            .result
            .ok_or_else(|| SourceError::Malformed(format!("{method} response without result")).into())
    }

    /// `eth_call` against the latest block.
    ///
    /// # Errors
    /// Returns an error if the call fails or the result is not hex data.
    pub async fn eth_call(&self, to: Address, data: Bytes) -> Result<Bytes> {
        let result = self
            .call("eth_call", json!([{ "to": to, "data": data }, "latest"]))
            .await?;
        serde_json::from_value(result).map_err(Error::from)
    }

    /// Current block number.
    ///
    /// # Errors
    /// Returns an error if the call fails or the result is not a hex quantity.
    pub async fn block_number(&self) -> Result<u64> {
        let result = self.call("eth_blockNumber", json!([])).await?;
        let raw = result
            .as_str()
            .ok_or_else(|| SourceError::Malformed("eth_blockNumber result is not a string".into()))?;
        parse_quantity(raw)
    }
}

/// Parse a `0x`-prefixed hex quantity.
///
/// # Errors
/// Returns [`Error::Parse`] for anything that is not a hex number.
pub fn parse_quantity(raw: &str) -> Result<u64> {
    let digits = raw
        .strip_prefix("0x")
        .ok_or_else(|| Error::Parse(format!("quantity without 0x prefix: {raw}")))?;
    u64::from_str_radix(digits, 16).map_err(|e| Error::Parse(format!("{raw}: {e}")))
}
