use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::db_types::{Invoice, InvoiceId, NewInvoice, Subscription};

#[derive(Debug, Clone, Error)]
pub enum SettlementError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Invoice {0} does not exist")]
    InvoiceNotFound(InvoiceId),
}

impl From<sqlx::Error> for SettlementError {
    fn from(e: sqlx::Error) -> Self {
        Self::DatabaseError(e.to_string())
    }
}

/// The storage behaviour a backend must expose to support the settlement pipeline.
///
/// Invoices are created by the (external) invoice API via [`Self::insert_invoice`]; the watcher
/// is the only writer that transitions invoice status, and it does so exclusively through the
/// conditional updates below.
#[allow(async_fn_in_trait)]
pub trait SettlementDatabase: Clone {
    /// The URL of the database.
    fn url(&self) -> &str;

    /// Stores a new invoice with status `Pending`. Idempotent: if an invoice with the same
    /// `invoice_id` already exists, the existing record is returned and the second element is
    /// `false`.
    async fn insert_invoice(&self, invoice: NewInvoice) -> Result<(Invoice, bool), SettlementError>;

    /// Fetches a single invoice by its identifier.
    async fn fetch_invoice(&self, invoice_id: &InvoiceId) -> Result<Option<Invoice>, SettlementError>;

    /// All invoices the watcher still has work to do on (`Pending` or `Paid`), oldest first,
    /// bounded by `limit`.
    async fn fetch_open_invoices(&self, limit: i64) -> Result<Vec<Invoice>, SettlementError>;

    /// Records that a qualifying transfer has been seen but is not yet deep enough: sets status
    /// to `Paid`, stores the transaction hash and confirmation count, and stamps `paid_at` on
    /// first sight only (an existing `paid_at` is preserved).
    ///
    /// The write is a single conditional update applied only while the invoice is `Pending` or
    /// `Paid`. Returns the updated invoice, or `None` if the invoice had already reached a
    /// terminal state.
    async fn mark_invoice_paid(
        &self,
        invoice_id: &InvoiceId,
        tx_hash: &str,
        confirmations: u64,
        seen_at: DateTime<Utc>,
    ) -> Result<Option<Invoice>, SettlementError>;

    /// Transitions an invoice to `Confirmed` in one atomic, conditional update: status,
    /// transaction hash, confirmation count, `paid_at` (preserved if set) and `confirmed_at`
    /// (set exactly once) all change together.
    ///
    /// Returns the updated invoice when the row actually transitioned, `None` otherwise. A
    /// `Some` result is the caller's licence to credit the subscription: it is returned at most
    /// once per invoice, even with concurrent writers.
    async fn confirm_invoice(
        &self,
        invoice_id: &InvoiceId,
        tx_hash: &str,
        confirmations: u64,
        confirmed_at: DateTime<Utc>,
    ) -> Result<Option<Invoice>, SettlementError>;

    /// Expires all `Pending` invoices created more than `lifetime` ago. Paid invoices are never
    /// expired; once a payment is on chain the customer is waiting on confirmations, not on us.
    /// Returns the invoices that were expired by this call.
    async fn expire_invoices_older_than(
        &self,
        lifetime: Duration,
        now: DateTime<Utc>,
    ) -> Result<Vec<Invoice>, SettlementError>;

    /// The subscription with the latest expiry for the given user, if any.
    async fn fetch_latest_subscription(&self, user_id: &str) -> Result<Option<Subscription>, SettlementError>;

    /// The subscription extender. Credits the invoice's user with one plan period, computed
    /// from `max(latest expiry, now)` so an existing entitlement is never shortened.
    ///
    /// Idempotent at the storage layer: a settlement-ledger row keyed by `invoice_id` is
    /// inserted in the same transaction as the subscription, so calling this twice for one
    /// invoice (including across process restarts) credits the user exactly once. Returns the
    /// new subscription, or `None` when the invoice had already been credited.
    async fn extend_subscription(
        &self,
        invoice: &Invoice,
        now: DateTime<Utc>,
    ) -> Result<Option<Subscription>, SettlementError>;
}
