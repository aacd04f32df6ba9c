//! `SqliteDatabase` is the concrete storage backend for the settlement engine.
//!
//! It implements [`SettlementDatabase`] over a `sqlx` connection pool. Every state transition
//! is a single conditional UPDATE, and the subscription extender runs its ledger claim and
//! subscription insert inside one transaction.
use std::fmt::Debug;

use chrono::{DateTime, Duration, Utc};
use log::*;
use sqlx::SqlitePool;

use super::db::{db_url, invoices, new_pool, subscriptions};
use crate::{
    db_types::{Invoice, InvoiceId, NewInvoice, Subscription},
    traits::{SettlementDatabase, SettlementError},
};

/// Applies the embedded schema migrations to the given pool.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SettlementError> {
    sqlx::migrate!("./src/sqlite/migrations")
        .run(pool)
        .await
        .map_err(|e| SettlementError::DatabaseError(e.to_string()))
}

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Connects using the URL from the environment (`XSG_DATABASE_URL`).
    pub async fn new(max_connections: u32) -> Result<Self, SettlementError> {
        let url = db_url();
        Self::new_with_url(&url, max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, SettlementError> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl SettlementDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_invoice(&self, invoice: NewInvoice) -> Result<(Invoice, bool), SettlementError> {
        let mut conn = self.pool.acquire().await?;
        invoices::idempotent_insert(invoice, &mut conn).await
    }

    async fn fetch_invoice(&self, invoice_id: &InvoiceId) -> Result<Option<Invoice>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let invoice = invoices::fetch_invoice_by_invoice_id(invoice_id, &mut conn).await?;
        Ok(invoice)
    }

    async fn fetch_open_invoices(&self, limit: i64) -> Result<Vec<Invoice>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let invoices = invoices::fetch_open_invoices(limit, &mut conn).await?;
        Ok(invoices)
    }

    async fn mark_invoice_paid(
        &self,
        invoice_id: &InvoiceId,
        tx_hash: &str,
        confirmations: u64,
        seen_at: DateTime<Utc>,
    ) -> Result<Option<Invoice>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        #[allow(clippy::cast_possible_wrap)]
        let invoice = invoices::mark_paid(invoice_id, tx_hash, confirmations as i64, seen_at, &mut conn).await?;
        Ok(invoice)
    }

    async fn confirm_invoice(
        &self,
        invoice_id: &InvoiceId,
        tx_hash: &str,
        confirmations: u64,
        confirmed_at: DateTime<Utc>,
    ) -> Result<Option<Invoice>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        #[allow(clippy::cast_possible_wrap)]
        let invoice = invoices::confirm(invoice_id, tx_hash, confirmations as i64, confirmed_at, &mut conn).await?;
        Ok(invoice)
    }

    async fn expire_invoices_older_than(
        &self,
        lifetime: Duration,
        now: DateTime<Utc>,
    ) -> Result<Vec<Invoice>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let cutoff = now - lifetime;
        let expired = invoices::expire_created_before(cutoff, now, &mut conn).await?;
        if !expired.is_empty() {
            debug!("🗃️ {} invoices expired (created before {cutoff})", expired.len());
        }
        Ok(expired)
    }

    async fn fetch_latest_subscription(&self, user_id: &str) -> Result<Option<Subscription>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let subscription = subscriptions::fetch_latest_for_user(user_id, &mut conn).await?;
        Ok(subscription)
    }

    async fn extend_subscription(
        &self,
        invoice: &Invoice,
        now: DateTime<Utc>,
    ) -> Result<Option<Subscription>, SettlementError> {
        let mut tx = self.pool.begin().await?;
        if !subscriptions::try_claim_settlement(&invoice.invoice_id, &mut tx).await? {
            debug!("🗃️ Invoice [{}] is already in the settlement ledger", invoice.invoice_id);
            return Ok(None);
        }
        let base = subscriptions::fetch_latest_for_user(&invoice.user_id, &mut tx)
            .await?
            .map(|sub| sub.expires_at)
            .filter(|expiry| *expiry > now)
            .unwrap_or(now);
        let expires_at = base + invoice.plan.duration();
        let subscription =
            subscriptions::insert_subscription(&invoice.user_id, invoice.plan, base, expires_at, now, &mut tx).await?;
        subscriptions::link_settlement(&invoice.invoice_id, subscription.id, &mut tx).await?;
        tx.commit().await?;
        debug!(
            "🗃️ User {} credited with one {} period for invoice [{}]; entitlement now ends {}",
            invoice.user_id, invoice.plan, invoice.invoice_id, subscription.expires_at
        );
        Ok(Some(subscription))
    }
}
