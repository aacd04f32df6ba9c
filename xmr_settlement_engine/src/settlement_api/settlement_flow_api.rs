use std::fmt::Debug;

use chrono::{DateTime, Duration, Utc};
use log::*;

use crate::{
    db_types::{IncomingTransfer, Invoice, Subscription},
    helpers::matcher::best_transfer_match,
    traits::{SettlementDatabase, SettlementError},
};

/// The result of running the settlement logic over one invoice for one poll cycle.
#[derive(Debug, Clone)]
pub enum SettlementOutcome {
    /// No qualifying transfer is visible yet. Not an error; the invoice stays `Pending`.
    NoMatch,
    /// A qualifying transfer was recorded but has not reached the required depth. The invoice
    /// is `Paid`.
    AwaitingConfirmations(Invoice),
    /// The invoice crossed into `Confirmed` on this poll. `subscription` is the row the
    /// extender created, or `None` if the invoice had already been credited (e.g. after a
    /// crash between the confirm write and the extension).
    Confirmed { invoice: Invoice, subscription: Option<Subscription> },
    /// Nothing was written; the invoice had already reached a terminal state.
    Unchanged,
}

/// `SettlementFlowApi` advances invoices through their lifecycle in response to what the wallet
/// can see on chain. It is the only component that transitions invoice state.
pub struct SettlementFlowApi<B> {
    db: B,
}

impl<B> Debug for SettlementFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SettlementFlowApi")
    }
}

impl<B> SettlementFlowApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> SettlementFlowApi<B>
where B: SettlementDatabase
{
    /// Fetches the invoices the watcher still has work to do on, oldest first.
    pub async fn fetch_open_invoices(&self, limit: i64) -> Result<Vec<Invoice>, SettlementError> {
        self.db.fetch_open_invoices(limit).await
    }

    /// Runs the settlement logic for one invoice against the transfers currently visible for
    /// its receiving subaddress. See [`Self::process_invoice_at`].
    pub async fn process_invoice(
        &self,
        invoice: &Invoice,
        transfers: &[IncomingTransfer],
        current_height: u64,
    ) -> Result<SettlementOutcome, SettlementError> {
        self.process_invoice_at(invoice, transfers, current_height, Utc::now()).await
    }

    /// Clock-injected variant of [`Self::process_invoice`], used directly by tests.
    ///
    /// The flow per poll:
    /// 1. The matcher picks the best qualifying transfer (amount >= requested; the recorded
    ///    `tx_hash` stays matched while visible; otherwise freshest-first).
    /// 2. Below the required depth, the invoice is marked `Paid`; `paid_at` is stamped on first
    ///    sight and preserved afterwards.
    /// 3. At or beyond the required depth, the invoice is confirmed with a conditional update.
    ///    Only when that update actually transitions the row is the subscription extender
    ///    invoked, so the extender fires exactly once per invoice confirmation.
    ///
    /// Re-running with identical inputs is a no-op (`Unchanged`), which makes the watcher safe
    /// against overlapping deployments and replayed cycles.
    pub async fn process_invoice_at(
        &self,
        invoice: &Invoice,
        transfers: &[IncomingTransfer],
        current_height: u64,
        now: DateTime<Utc>,
    ) -> Result<SettlementOutcome, SettlementError> {
        if invoice.status.is_terminal() {
            trace!("⛓️ Invoice [{}] is already {}; nothing to do", invoice.invoice_id, invoice.status);
            return Ok(SettlementOutcome::Unchanged);
        }
        let recorded = invoice.tx_hash.as_deref();
        let Some(m) = best_transfer_match(invoice.amount_requested, recorded, transfers, current_height) else {
            if let Some(txid) = recorded {
                // Reorg territory. Automatic reversion to Pending is a product decision that has
                // not been taken, so hold the invoice and keep shouting.
                warn!(
                    "⛓️⚠️ Invoice [{}] recorded transfer {txid}, but the wallet no longer reports it. Leaving the \
                     invoice in {} until the transaction reappears or the policy says otherwise.",
                    invoice.invoice_id, invoice.status
                );
            }
            return Ok(SettlementOutcome::NoMatch);
        };
        if recorded.is_some_and(|txid| txid != m.txid) {
            info!(
                "⛓️ Invoice [{}] previously matched {}, which has disappeared from the wallet's view. Re-matching \
                 against {}.",
                invoice.invoice_id,
                recorded.unwrap_or_default(),
                m.txid
            );
        }
        if (m.confirmations as i64) < invoice.required_confirmations {
            let updated = self.db.mark_invoice_paid(&invoice.invoice_id, &m.txid, m.confirmations, now).await?;
            match updated {
                Some(inv) => {
                    debug!(
                        "⛓️💰️ Invoice [{}] paid by {} ({} of {} confirmations)",
                        inv.invoice_id, m.txid, m.confirmations, inv.required_confirmations
                    );
                    Ok(SettlementOutcome::AwaitingConfirmations(inv))
                },
                None => Ok(SettlementOutcome::Unchanged),
            }
        } else {
            let updated = self.db.confirm_invoice(&invoice.invoice_id, &m.txid, m.confirmations, now).await?;
            match updated {
                Some(inv) => {
                    info!(
                        "⛓️✅️ Invoice [{}] confirmed: {} at height {} with {} confirmations",
                        inv.invoice_id, m.txid, m.height, m.confirmations
                    );
                    let subscription = self.db.extend_subscription(&inv, now).await?;
                    match &subscription {
                        Some(sub) => info!(
                            "📅️ Subscription #{} for user {} runs until {} ({} plan)",
                            sub.id, sub.user_id, sub.expires_at, sub.plan
                        ),
                        None => debug!(
                            "📅️ Invoice [{}] was already credited; no new subscription row",
                            inv.invoice_id
                        ),
                    }
                    Ok(SettlementOutcome::Confirmed { invoice: inv, subscription })
                },
                None => Ok(SettlementOutcome::Unchanged),
            }
        }
    }

    /// Expires `Pending` invoices older than `lifetime` and returns them.
    pub async fn expire_old_invoices(&self, lifetime: Duration) -> Result<Vec<Invoice>, SettlementError> {
        self.db.expire_invoices_older_than(lifetime, Utc::now()).await
    }

    /// The user's current entitlement, if any.
    pub async fn fetch_latest_subscription(&self, user_id: &str) -> Result<Option<Subscription>, SettlementError> {
        self.db.fetch_latest_subscription(user_id).await
    }
}
