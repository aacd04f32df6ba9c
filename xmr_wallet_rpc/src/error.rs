use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalletRpcError {
    #[error("Could not initialize wallet RPC client: {0}")]
    Initialization(String),
    #[error("Transport failure calling {method}: {message}")]
    Transport { method: String, message: String },
    #[error("Wallet RPC call {method} failed. HTTP {status}. {message}")]
    HttpStatus { method: String, status: u16, message: String },
    #[error("Wallet daemon rejected {method} (code {code}): {message}")]
    Rpc { method: String, code: i64, message: String },
    #[error("Wallet RPC call {method} returned neither a result nor an error")]
    EmptyResponse { method: String },
    #[error("Could not deserialize wallet RPC response for {method}: {message}")]
    Json { method: String, message: String },
}
