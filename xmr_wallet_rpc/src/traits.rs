use crate::{data_objects::TransferEntry, WalletRpcError};

/// The slice of `monero-wallet-rpc` the settlement watcher consumes.
///
/// [`crate::WalletRpcApi`] is the production implementation. Tests implement this trait with a
/// fake so that full poll cycles can run without a wallet daemon.
#[allow(async_fn_in_trait)]
pub trait WalletRpc: Clone {
    /// The current wallet-synced block height.
    async fn get_height(&self) -> Result<u64, WalletRpcError>;

    /// Incoming transfers for the given wallet account, optionally restricted to a set of
    /// subaddress (minor) indices.
    async fn get_transfers(
        &self,
        account_index: u32,
        subaddr_indices: Option<Vec<u32>>,
    ) -> Result<Vec<TransferEntry>, WalletRpcError>;
}
