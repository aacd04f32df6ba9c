use log::*;
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use xmr_settlement_engine::{
    db_types::{IncomingTransfer, Invoice},
    SettlementDatabase,
    SettlementFlowApi,
    SettlementOutcome,
    SqliteDatabase,
};
use xmr_wallet_rpc::{data_objects::TransferEntry, WalletRpc, WalletRpcApi};
use xsg_common::Piconero;

use crate::{config::WatcherConfig, errors::WatcherError};

/// What one poll cycle did, for logging and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct CycleSummary {
    pub expired: usize,
    pub examined: usize,
    pub awaiting: usize,
    pub confirmed: usize,
    pub failed: usize,
}

/// Starts the settlement watcher. Do not await the returned JoinHandle, as it will run
/// indefinitely.
///
/// One cycle runs at a time; the interval timer only fires again after the previous cycle has
/// returned, so cycles never overlap. Any error escaping a cycle is logged and the loop simply
/// waits for the next tick — a wallet or database outage delays settlement, it never kills the
/// process.
///
/// The spawned task is pinned to the concrete backends. [`run_settlement_cycle`] stays generic
/// over the storage and wallet traits for tests; their async methods make no promise about the
/// `Send`-ness of their futures, so generic code cannot cross `tokio::spawn`.
pub fn start_settlement_watcher(db: SqliteDatabase, rpc: WalletRpcApi, config: WatcherConfig) -> JoinHandle<()> {
    tokio::spawn(async move {
        let api = SettlementFlowApi::new(db);
        let mut timer = tokio::time::interval(config.poll_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("🔭️ Settlement watcher started, polling every {}s", config.poll_interval.as_secs());
        loop {
            timer.tick().await;
            match run_settlement_cycle(&api, &rpc, &config).await {
                Ok(s) => debug!(
                    "🔭️ Cycle complete. {} examined, {} awaiting depth, {} confirmed, {} expired, {} failed",
                    s.examined, s.awaiting, s.confirmed, s.expired, s.failed
                ),
                Err(e) => error!("🔭️ Settlement cycle failed: {e}"),
            }
        }
    })
}

/// Runs one full reconciliation cycle: expire stale invoices, fetch the open ones, read the
/// chain height once, then settle each invoice against the transfers on its subaddress.
///
/// Per-invoice failures are logged and counted but never abort the batch. A failure to read
/// the chain height skips the rest of the cycle, since no invoice can be settled without it.
pub async fn run_settlement_cycle<B, W>(
    api: &SettlementFlowApi<B>,
    rpc: &W,
    config: &WatcherConfig,
) -> Result<CycleSummary, WatcherError>
where
    B: SettlementDatabase,
    W: WalletRpc,
{
    let mut summary = CycleSummary::default();
    let expired = api.expire_old_invoices(config.invoice_lifetime).await?;
    summary.expired = expired.len();
    for invoice in &expired {
        info!("🔭️⌛️ Invoice [{}] expired after waiting unpaid for its lifetime", invoice.invoice_id);
    }

    let invoices = api.fetch_open_invoices(config.page_size).await?;
    if invoices.is_empty() {
        return Ok(summary);
    }
    let current_height = match rpc.get_height().await {
        Ok(height) => height,
        Err(e) => {
            error!("🔭️ Could not fetch the wallet height; leaving {} invoices for the next cycle. {e}", invoices.len());
            return Ok(summary);
        },
    };
    trace!("🔭️ Wallet height is {current_height}; examining {} open invoices", invoices.len());

    for invoice in invoices {
        summary.examined += 1;
        match settle_invoice(api, rpc, &invoice, current_height, config).await {
            Ok(SettlementOutcome::AwaitingConfirmations(_)) => summary.awaiting += 1,
            Ok(SettlementOutcome::Confirmed { .. }) => summary.confirmed += 1,
            Ok(_) => {},
            Err(e) => {
                summary.failed += 1;
                error!("🔭️ Error settling invoice [{}]: {e}", invoice.invoice_id);
            },
        }
    }
    Ok(summary)
}

async fn settle_invoice<B, W>(
    api: &SettlementFlowApi<B>,
    rpc: &W,
    invoice: &Invoice,
    current_height: u64,
    config: &WatcherConfig,
) -> Result<SettlementOutcome, WatcherError>
where
    B: SettlementDatabase,
    W: WalletRpc,
{
    let subaddr_indices = invoice.address_index.map(|minor| vec![minor]);
    let entries = rpc.get_transfers(invoice.account_index, subaddr_indices).await?;
    let transfers = incoming_transfers(entries);
    let mut invoice = invoice.clone();
    if invoice.required_confirmations <= 0 {
        invoice.required_confirmations = config.default_required_confirmations;
    }
    let outcome = api.process_invoice(&invoice, &transfers, current_height).await?;
    Ok(outcome)
}

/// Maps wallet RPC transfer records into the engine's transfer type. Amounts beyond i64 range
/// cannot be legitimate payments and are dropped with a warning.
fn incoming_transfers(entries: Vec<TransferEntry>) -> Vec<IncomingTransfer> {
    entries
        .into_iter()
        .filter_map(|entry| match Piconero::try_from(entry.amount) {
            Ok(amount) => Some(IncomingTransfer { txid: entry.txid, amount, height: entry.height }),
            Err(e) => {
                warn!("🔭️ Ignoring transfer {}: {e}", entry.txid);
                None
            },
        })
        .collect()
}
