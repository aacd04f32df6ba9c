use thiserror::Error;
use xmr_settlement_engine::SettlementError;
use xmr_wallet_rpc::WalletRpcError;

#[derive(Debug, Error)]
pub enum WatcherError {
    #[error("Wallet RPC error: {0}")]
    Rpc(#[from] WalletRpcError),
    #[error("Settlement error: {0}")]
    Settlement(#[from] SettlementError),
}
