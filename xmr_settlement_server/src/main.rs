use dotenvy::dotenv;
use log::*;
use xmr_settlement_engine::{run_migrations, SqliteDatabase};
use xmr_settlement_server::{config::WatcherConfig, watcher::start_settlement_watcher};
use xmr_wallet_rpc::{WalletRpcApi, WalletRpcConfig};

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init();
    let config = WatcherConfig::from_env_or_default();

    let db = match SqliteDatabase::new_with_url(&config.database_url, 5).await {
        Ok(db) => db,
        Err(e) => {
            eprintln!("Could not open the settlement database at {}: {e}", config.database_url);
            return;
        },
    };
    if let Err(e) = run_migrations(db.pool()).await {
        eprintln!("Could not migrate the settlement database: {e}");
        return;
    }

    match WalletRpcConfig::try_from_env() {
        Some(rpc_config) => {
            let rpc = match WalletRpcApi::new(rpc_config) {
                Ok(rpc) => rpc,
                Err(e) => {
                    eprintln!("Could not create the wallet RPC client: {e}");
                    return;
                },
            };
            let handle = start_settlement_watcher(db, rpc, config);
            wait_for_shutdown().await;
            handle.abort();
        },
        None => {
            // The hosting process stays up so the rest of the gateway keeps serving reads;
            // only settlement is off.
            warn!(
                "🚨️ XSG_WALLET_RPC_URL is not set. The settlement watcher is DISABLED: invoices will be created but \
                 never settled until the wallet RPC endpoint is configured."
            );
            wait_for_shutdown().await;
        },
    }
    info!("Bye!");
}

async fn wait_for_shutdown() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Could not listen for the shutdown signal: {e}");
    }
}
