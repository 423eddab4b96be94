//! JSON-RPC wire types shared by the HTTP client and the log subscription.

use alloy_primitives::{Address, Bytes, B256, U64};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::SourceError;

/// Build a JSON-RPC 2.0 request body.
#[must_use]
pub fn request(id: u64, method: &str, params: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
        "params": params,
    })
}

/// Error object of a JSON-RPC response.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcErrorBody {
    pub code: i64,
    pub message: String,
}

impl From<RpcErrorBody> for SourceError {
    fn from(body: RpcErrorBody) -> Self {
        SourceError::Rpc {
            code: body.code,
            message: body.message,
        }
    }
}

/// Any frame received from a JSON-RPC endpoint.
///
/// Responses carry `id` and `result`/`error`; subscription notifications
/// carry `method` and `params`.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcEnvelope {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcErrorBody>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub params: Option<NotificationParams>,
}

impl RpcEnvelope {
    /// The log carried by an `eth_subscription` notification, if any.
    #[must_use]
    pub fn into_log(self) -> Option<RpcLog> {
        if self.method.as_deref() != Some("eth_subscription") {
            return None;
        }
        self.params.map(|p| p.result)
    }
}

/// Parameters of an `eth_subscription` notification.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationParams {
    pub subscription: String,
    pub result: RpcLog,
}

/// A log entry as returned by `eth_subscribe("logs")`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcLog {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    #[serde(default)]
    pub block_number: Option<U64>,
    #[serde(default)]
    pub transaction_hash: Option<B256>,
    #[serde(default)]
    pub log_index: Option<U64>,
    #[serde(default)]
    pub removed: bool,
}
