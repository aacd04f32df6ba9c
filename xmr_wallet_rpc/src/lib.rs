//! A thin client for `monero-wallet-rpc`.
//!
//! The settlement pipeline only consumes two wallet calls: `get_height` and `get_transfers`.
//! This crate wraps them in a small JSON-RPC 2.0 client with bounded request timeouts and
//! optional HTTP Basic authentication. There is deliberately no retry logic here; the poll loop
//! owns the retry policy (it simply tries again on the next cycle).
//!
//! The [`WalletRpc`] trait is the seam the watcher is written against, so tests can drive a full
//! settlement cycle with a fake wallet instead of a live daemon.
mod api;
mod config;
mod error;
mod traits;

pub mod data_objects;

pub use api::WalletRpcApi;
pub use config::{RpcCredentials, WalletRpcConfig, DEFAULT_RPC_TIMEOUT};
pub use error::WalletRpcError;
pub use traits::WalletRpc;
