use std::sync::Arc;

use log::*;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::{
    config::WalletRpcConfig,
    data_objects::{GetHeightResult, GetTransfersParams, GetTransfersResult, JsonRpcResponse, TransferEntry},
    traits::WalletRpc,
    WalletRpcError,
};

/// JSON-RPC 2.0 client for `monero-wallet-rpc`.
///
/// The client is cheap to clone (the underlying connection pool is shared) and stateless, so one
/// instance can be reused for the lifetime of the watcher. Every request carries the configured
/// timeout; there are no internal retries.
#[derive(Clone)]
pub struct WalletRpcApi {
    config: WalletRpcConfig,
    client: Arc<Client>,
}

impl WalletRpcApi {
    pub fn new(config: WalletRpcConfig) -> Result<Self, WalletRpcError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| WalletRpcError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    /// Issues a single JSON-RPC call and deserializes the `result` member.
    ///
    /// Fails on transport errors (including timeouts), non-2xx HTTP statuses, and responses
    /// carrying a JSON-RPC `error` member.
    pub async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, WalletRpcError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": "0",
            "method": method,
            "params": params,
        });
        trace!("🔌️ Sending wallet RPC call {method}");
        let mut req = self.client.post(self.config.json_rpc_url()).json(&body);
        if let Some(creds) = &self.config.credentials {
            req = req.basic_auth(&creds.username, Some(creds.password.reveal()));
        }
        let response = req
            .send()
            .await
            .map_err(|e| WalletRpcError::Transport { method: method.to_string(), message: e.to_string() })?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(WalletRpcError::HttpStatus { method: method.to_string(), status, message });
        }
        let envelope = response
            .json::<JsonRpcResponse<T>>()
            .await
            .map_err(|e| WalletRpcError::Json { method: method.to_string(), message: e.to_string() })?;
        if let Some(err) = envelope.error {
            return Err(WalletRpcError::Rpc { method: method.to_string(), code: err.code, message: err.message });
        }
        envelope.result.ok_or_else(|| WalletRpcError::EmptyResponse { method: method.to_string() })
    }
}

impl WalletRpc for WalletRpcApi {
    async fn get_height(&self) -> Result<u64, WalletRpcError> {
        let result: GetHeightResult = self.call("get_height", json!({})).await?;
        Ok(result.height)
    }

    async fn get_transfers(
        &self,
        account_index: u32,
        subaddr_indices: Option<Vec<u32>>,
    ) -> Result<Vec<TransferEntry>, WalletRpcError> {
        let params = GetTransfersParams { incoming: true, account_index, subaddr_indices };
        let params = serde_json::to_value(&params)
            .map_err(|e| WalletRpcError::Json { method: "get_transfers".to_string(), message: e.to_string() })?;
        let result: GetTransfersResult = self.call("get_transfers", params).await?;
        trace!("🔌️ get_transfers returned {} incoming transfers", result.incoming.len());
        Ok(result.incoming)
    }
}
