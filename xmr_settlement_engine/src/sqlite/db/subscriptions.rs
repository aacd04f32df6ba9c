use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use crate::db_types::{InvoiceId, Subscription, SubscriptionPlan};

/// The subscription with the latest expiry for the user, active or not.
pub async fn fetch_latest_for_user(
    user_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Subscription>, sqlx::Error> {
    let subscription = sqlx::query_as("SELECT * FROM subscriptions WHERE user_id = $1 ORDER BY expires_at DESC LIMIT 1")
        .bind(user_id)
        .fetch_optional(conn)
        .await?;
    Ok(subscription)
}

/// Claims the settlement for an invoice by inserting its ledger row. Returns `false` when the
/// invoice has already been claimed (the UNIQUE constraint on `invoice_id` holds). Run this
/// inside the same transaction as the subscription insert.
pub async fn try_claim_settlement(invoice_id: &InvoiceId, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("INSERT OR IGNORE INTO settlement_ledger (invoice_id) VALUES ($1)")
        .bind(invoice_id.as_str())
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn insert_subscription(
    user_id: &str,
    plan: SubscriptionPlan,
    starts_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Subscription, sqlx::Error> {
    let subscription = sqlx::query_as(
        r#"
            INSERT INTO subscriptions (user_id, plan, starts_at, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(user_id)
    .bind(plan)
    .bind(starts_at)
    .bind(expires_at)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(subscription)
}

/// Links the ledger claim to the subscription row it produced.
pub async fn link_settlement(
    invoice_id: &InvoiceId,
    subscription_id: i64,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE settlement_ledger SET subscription_id = $2 WHERE invoice_id = $1")
        .bind(invoice_id.as_str())
        .bind(subscription_id)
        .execute(conn)
        .await?;
    Ok(())
}
