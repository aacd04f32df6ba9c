use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};
use xmr_settlement_engine::SqliteDatabase;

/// Creates a fresh, migrated test database and returns a handle to it.
pub async fn new_test_database() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating connection to database")
}

pub async fn prepare_test_env(url: &str) {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    if let Err(e) = Sqlite::drop_database(url).await {
        warn!("Error dropping database {url}: {e:?}");
    }
    Sqlite::create_database(url).await.expect("Error creating database");
    let db = SqliteDatabase::new_with_url(url, 5).await.expect("Error creating connection to database");
    sqlx::migrate!("./src/sqlite/migrations").run(db.pool()).await.expect("Error running DB migrations");
    debug!("🚀️ Test database ready at {url}");
}

pub fn random_db_path() -> String {
    format!("sqlite:///tmp/xsg_test_store_{}.db", rand::random::<u64>())
}
