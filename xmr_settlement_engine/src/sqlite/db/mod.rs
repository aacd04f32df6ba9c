pub mod invoices;
pub mod subscriptions;

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

/// The database URL from `XSG_DATABASE_URL`, falling back to a local file store.
pub fn db_url() -> String {
    std::env::var("XSG_DATABASE_URL").unwrap_or_else(|_| "sqlite://data/settlements.db".to_string())
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    SqlitePoolOptions::new().max_connections(max_connections).connect(url).await
}
