use chrono::{DateTime, Utc};
use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Invoice, InvoiceId, NewInvoice},
    traits::SettlementError,
};

/// Inserts the invoice into the database, returning `false` in the second element if an invoice
/// with the same `invoice_id` already exists.
///
/// The insert itself carries the idempotency (`ON CONFLICT ... DO NOTHING`); a fetch-then-insert
/// pair would race against writes landing on other pooled connections.
pub async fn idempotent_insert(
    invoice: NewInvoice,
    conn: &mut SqliteConnection,
) -> Result<(Invoice, bool), SettlementError> {
    let invoice_id = invoice.invoice_id.clone();
    let inserted: Option<Invoice> = sqlx::query_as(
        r#"
            INSERT INTO invoices (
                invoice_id,
                user_id,
                receiving_address,
                account_index,
                address_index,
                amount_requested,
                plan,
                required_confirmations,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            ON CONFLICT (invoice_id) DO NOTHING
            RETURNING *;
        "#,
    )
    .bind(invoice.invoice_id)
    .bind(invoice.user_id)
    .bind(invoice.receiving_address)
    .bind(invoice.account_index)
    .bind(invoice.address_index)
    .bind(invoice.amount_requested.value())
    .bind(invoice.plan)
    .bind(invoice.required_confirmations)
    .bind(invoice.created_at)
    .fetch_optional(&mut *conn)
    .await?;
    match inserted {
        Some(invoice) => {
            debug!("🧾️ Invoice [{}] inserted with id {}", invoice.invoice_id, invoice.id);
            Ok((invoice, true))
        },
        None => {
            let existing = fetch_invoice_by_invoice_id(&invoice_id, conn)
                .await?
                .ok_or(SettlementError::InvoiceNotFound(invoice_id))?;
            Ok((existing, false))
        },
    }
}

pub async fn fetch_invoice_by_invoice_id(
    invoice_id: &InvoiceId,
    conn: &mut SqliteConnection,
) -> Result<Option<Invoice>, sqlx::Error> {
    let invoice = sqlx::query_as("SELECT * FROM invoices WHERE invoice_id = $1")
        .bind(invoice_id.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(invoice)
}

/// All invoices in an open state (`Pending` or `Paid`), oldest first, bounded by `limit`.
pub async fn fetch_open_invoices(limit: i64, conn: &mut SqliteConnection) -> Result<Vec<Invoice>, sqlx::Error> {
    let invoices = sqlx::query_as(
        "SELECT * FROM invoices WHERE status IN ('Pending', 'Paid') ORDER BY created_at ASC LIMIT $1",
    )
    .bind(limit)
    .fetch_all(conn)
    .await?;
    Ok(invoices)
}

/// Conditionally transitions an invoice to `Paid`. All fields change in one statement, and the
/// `WHERE` clause guarantees the status never moves backwards: a terminal invoice is left
/// untouched and `None` is returned. `paid_at` is only stamped the first time.
pub async fn mark_paid(
    invoice_id: &InvoiceId,
    tx_hash: &str,
    confirmations: i64,
    seen_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Invoice>, sqlx::Error> {
    let invoice = sqlx::query_as(
        r#"
            UPDATE invoices SET
                status = 'Paid',
                tx_hash = $2,
                confirmations = $3,
                paid_at = COALESCE(paid_at, $4),
                updated_at = $4
            WHERE invoice_id = $1 AND status IN ('Pending', 'Paid')
            RETURNING *;
        "#,
    )
    .bind(invoice_id.as_str())
    .bind(tx_hash)
    .bind(confirmations)
    .bind(seen_at)
    .fetch_optional(conn)
    .await?;
    Ok(invoice)
}

/// Conditionally transitions an invoice to `Confirmed`. The returned row doubles as the
/// at-most-once guard for the subscription extender: the `WHERE` clause only matches open
/// invoices, so exactly one caller can ever observe the transition.
pub async fn confirm(
    invoice_id: &InvoiceId,
    tx_hash: &str,
    confirmations: i64,
    confirmed_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Invoice>, sqlx::Error> {
    let invoice = sqlx::query_as(
        r#"
            UPDATE invoices SET
                status = 'Confirmed',
                tx_hash = $2,
                confirmations = $3,
                paid_at = COALESCE(paid_at, $4),
                confirmed_at = COALESCE(confirmed_at, $4),
                updated_at = $4
            WHERE invoice_id = $1 AND status IN ('Pending', 'Paid')
            RETURNING *;
        "#,
    )
    .bind(invoice_id.as_str())
    .bind(tx_hash)
    .bind(confirmations)
    .bind(confirmed_at)
    .fetch_optional(conn)
    .await?;
    Ok(invoice)
}

/// Expires all `Pending` invoices created before `cutoff` and returns them. `Paid` invoices are
/// not touched; their payment is on chain and just needs depth.
pub async fn expire_created_before(
    cutoff: DateTime<Utc>,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<Invoice>, sqlx::Error> {
    let invoices = sqlx::query_as(
        r#"
            UPDATE invoices SET status = 'Expired', updated_at = $2
            WHERE status = 'Pending' AND created_at < $1
            RETURNING *;
        "#,
    )
    .bind(cutoff)
    .bind(now)
    .fetch_all(conn)
    .await?;
    Ok(invoices)
}
