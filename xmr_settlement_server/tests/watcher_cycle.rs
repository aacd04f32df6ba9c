//! End-to-end watcher cycle tests against a real SQLite store and a scripted wallet.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use xmr_settlement_engine::{
    db_types::{InvoiceId, InvoiceStatus, NewInvoice, SubscriptionPlan},
    test_utils::{prepare_test_env, random_db_path},
    SettlementDatabase,
    SettlementFlowApi,
    SqliteDatabase,
};
use xmr_settlement_server::{
    config::WatcherConfig,
    watcher::{run_settlement_cycle, start_settlement_watcher},
};
use xmr_wallet_rpc::{data_objects::TransferEntry, WalletRpc, WalletRpcApi, WalletRpcConfig, WalletRpcError};
use xsg_common::Piconero;

/// A scripted stand-in for `monero-wallet-rpc`. Transfers are keyed by minor subaddress index,
/// and individual subaddresses (or the height call itself) can be told to fail.
#[derive(Clone, Default)]
struct FakeWalletRpc {
    state: Arc<Mutex<WalletState>>,
}

#[derive(Default)]
struct WalletState {
    height: u64,
    height_fails: bool,
    transfers: HashMap<u32, Vec<TransferEntry>>,
    failing_subaddresses: Vec<u32>,
}

impl FakeWalletRpc {
    fn with_height(height: u64) -> Self {
        let rpc = Self::default();
        rpc.state.lock().unwrap().height = height;
        rpc
    }

    fn add_transfer(&self, minor: u32, entry: TransferEntry) {
        self.state.lock().unwrap().transfers.entry(minor).or_default().push(entry);
    }

    fn fail_subaddress(&self, minor: u32) {
        self.state.lock().unwrap().failing_subaddresses.push(minor);
    }

    fn fail_height(&self) {
        self.state.lock().unwrap().height_fails = true;
    }
}

impl WalletRpc for FakeWalletRpc {
    async fn get_height(&self) -> Result<u64, WalletRpcError> {
        let state = self.state.lock().unwrap();
        if state.height_fails {
            return Err(WalletRpcError::Transport {
                method: "get_height".to_string(),
                message: "connection refused".to_string(),
            });
        }
        Ok(state.height)
    }

    async fn get_transfers(
        &self,
        _account_index: u32,
        subaddr_indices: Option<Vec<u32>>,
    ) -> Result<Vec<TransferEntry>, WalletRpcError> {
        let state = self.state.lock().unwrap();
        let minors = subaddr_indices.unwrap_or_else(|| state.transfers.keys().copied().collect());
        if let Some(minor) = minors.iter().find(|m| state.failing_subaddresses.contains(m)) {
            return Err(WalletRpcError::Transport {
                method: "get_transfers".to_string(),
                message: format!("timed out fetching transfers for subaddress {minor}"),
            });
        }
        let result = minors.iter().flat_map(|m| state.transfers.get(m).cloned().unwrap_or_default()).collect();
        Ok(result)
    }
}

async fn new_test_database() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating test database")
}

fn new_invoice(invoice_id: &str, user_id: &str, amount_xmr: f64, minor: u32) -> NewInvoice {
    NewInvoice::new(
        InvoiceId::from(invoice_id.to_string()),
        user_id,
        "888tNkZrPN6JsEgekjMnABU4TBzc2Dt29EPAvkRxbANsAnjyPbb3iQ1YBRk1UXcdRsiKc9dhwMVgN5S9cQUiyoogDavup3H",
        Piconero::from_xmr(amount_xmr),
        SubscriptionPlan::Monthly,
        3,
    )
    .on_subaddress(0, minor)
}

#[tokio::test]
async fn one_wallet_failure_does_not_stall_the_rest_of_the_batch() {
    let db = new_test_database().await;
    let api = SettlementFlowApi::new(db.clone());
    let config = WatcherConfig::default();

    let (alice, _) = db.insert_invoice(new_invoice("inv-alice", "alice", 1.0, 5)).await.unwrap();
    let (bob, _) = db.insert_invoice(new_invoice("inv-bob", "bob", 1.0, 7)).await.unwrap();

    // Alice's payment is mined at 100 and the wallet tip is 103, so it is 3 deep. Bob's
    // subaddress query fails outright.
    let rpc = FakeWalletRpc::with_height(103);
    rpc.add_transfer(5, TransferEntry::new("txA", Piconero::from_xmr(1.0).value() as u64, 100));
    rpc.fail_subaddress(7);

    let summary = run_settlement_cycle(&api, &rpc, &config).await.unwrap();
    assert_eq!(summary.examined, 2);
    assert_eq!(summary.confirmed, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.expired, 0);

    let alice_after = db.fetch_invoice(&alice.invoice_id).await.unwrap().unwrap();
    assert_eq!(alice_after.status, InvoiceStatus::Confirmed);
    assert_eq!(alice_after.tx_hash.as_deref(), Some("txA"));
    assert_eq!(alice_after.confirmations, 3);
    let sub = api.fetch_latest_subscription("alice").await.unwrap();
    assert!(sub.is_some(), "the confirmed invoice must have created a subscription");

    // Bob's invoice is untouched and will simply be retried on the next cycle.
    let bob_after = db.fetch_invoice(&bob.invoice_id).await.unwrap().unwrap();
    assert_eq!(bob_after.status, InvoiceStatus::Pending);
    assert!(bob_after.tx_hash.is_none());
    assert!(api.fetch_latest_subscription("bob").await.unwrap().is_none());
}

#[tokio::test]
async fn a_height_failure_skips_the_cycle_without_touching_invoices() {
    let db = new_test_database().await;
    let api = SettlementFlowApi::new(db.clone());
    let config = WatcherConfig::default();

    let (carol, _) = db.insert_invoice(new_invoice("inv-carol", "carol", 0.5, 2)).await.unwrap();
    let rpc = FakeWalletRpc::with_height(200);
    rpc.add_transfer(2, TransferEntry::new("txC", Piconero::from_xmr(0.5).value() as u64, 195));
    rpc.fail_height();

    let summary = run_settlement_cycle(&api, &rpc, &config).await.unwrap();
    assert_eq!(summary.examined, 0);
    assert_eq!(summary.confirmed, 0);
    assert_eq!(summary.failed, 0);

    let carol_after = db.fetch_invoice(&carol.invoice_id).await.unwrap().unwrap();
    assert_eq!(carol_after.status, InvoiceStatus::Pending);
    assert!(carol_after.tx_hash.is_none());
}

#[tokio::test]
async fn the_spawned_watcher_survives_an_unreachable_wallet() {
    let db = new_test_database().await;
    db.insert_invoice(new_invoice("inv-unreachable", "judy", 1.0, 1)).await.unwrap();
    let rpc = WalletRpcApi::new(WalletRpcConfig::new("http://127.0.0.1:1")).unwrap();
    let config = WatcherConfig { poll_interval: std::time::Duration::from_millis(10), ..WatcherConfig::default() };

    let handle = start_settlement_watcher(db.clone(), rpc, config);
    tokio::time::sleep(std::time::Duration::from_millis(60)).await;
    assert!(!handle.is_finished(), "the watcher loop must outlive failing cycles");
    handle.abort();
}

#[tokio::test]
async fn a_shallow_payment_waits_and_then_confirms_on_a_later_cycle() {
    let db = new_test_database().await;
    let api = SettlementFlowApi::new(db.clone());
    let config = WatcherConfig::default();

    let (dave, _) = db.insert_invoice(new_invoice("inv-dave", "dave", 2.0, 9)).await.unwrap();
    let rpc = FakeWalletRpc::with_height(501);
    rpc.add_transfer(9, TransferEntry::new("txD", Piconero::from_xmr(2.0).value() as u64, 500));

    // 1 of 3 confirmations: the payment is recorded but the invoice waits.
    let summary = run_settlement_cycle(&api, &rpc, &config).await.unwrap();
    assert_eq!(summary.awaiting, 1);
    assert_eq!(summary.confirmed, 0);
    let dave_after = db.fetch_invoice(&dave.invoice_id).await.unwrap().unwrap();
    assert_eq!(dave_after.status, InvoiceStatus::Paid);
    assert_eq!(dave_after.confirmations, 1);
    assert!(api.fetch_latest_subscription("dave").await.unwrap().is_none());

    // The chain advances past the required depth and the next cycle settles it.
    rpc.state.lock().unwrap().height = 503;
    let summary = run_settlement_cycle(&api, &rpc, &config).await.unwrap();
    assert_eq!(summary.confirmed, 1);
    let dave_after = db.fetch_invoice(&dave.invoice_id).await.unwrap().unwrap();
    assert_eq!(dave_after.status, InvoiceStatus::Confirmed);
    assert!(api.fetch_latest_subscription("dave").await.unwrap().is_some());
}
