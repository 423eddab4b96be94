//! Chain adapters for GMX-style Vault and PositionRouter contracts.
//!
//! - [`subscription::ChainLogStream`] - WebSocket log subscription (event source)
//! - [`vault::VaultReader`] - position state over HTTP JSON-RPC (enrichment)

pub mod abi;
pub mod decode;
pub mod dto;
pub mod rpc;
pub mod subscription;
pub mod vault;

pub use rpc::JsonRpcClient;
pub use subscription::ChainLogStream;
pub use vault::VaultReader;
