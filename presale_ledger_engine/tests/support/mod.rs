//! Shared bootstrap for the integration tests: a throwaway SQLite database per test, with
//! migrations applied.

use log::*;
use presale_ledger_engine::{ConfirmationGate, GatePolicy, SqliteDatabase};
use sqlx::{migrate, migrate::MigrateDatabase, Sqlite};

/// The receiving address the test policy expects on-chain payments to be made out to.
pub const RECEIVER: &str = "0x1111111111111111111111111111111111111111";

/// Mainnet USDT contract on Ethereum, as carried by the default policy.
pub const USDT_ETH: &str = "0xdac17f958d2ee523a2206206994597c13d831ec7";

pub fn random_db_path() -> String {
    format!("sqlite://data/test_store_{}.db", rand::random::<u64>())
}

pub async fn prepare_test_env(url: &str) {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    debug!("🚀️ Logging initialised");
    let _ = std::fs::create_dir_all("data");
    create_database(url).await;
    run_migrations(url).await;
}

async fn run_migrations(url: &str) {
    let db = SqliteDatabase::new_with_url(url, 1).await.expect("Error creating connection to database");
    migrate!("./src/sqlite/migrations").run(db.pool()).await.expect("Error running DB migrations");
    info!("🚀️ Migrations complete");
}

async fn create_database(url: &str) {
    if let Err(e) = Sqlite::drop_database(url).await {
        warn!("Error dropping database {url}: {e:?}");
    }
    Sqlite::create_database(url).await.expect("Error creating database");
    info!("Created Sqlite database {url}");
}

/// A fresh, migrated database on a single-connection pool.
pub async fn new_test_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 1).await.expect("Error opening the test database")
}

/// The default policy pointed at the test receiving address.
pub fn test_policy() -> GatePolicy {
    let mut policy = GatePolicy::default();
    policy.receiving_address = RECEIVER.to_string();
    policy
}

pub fn test_gate() -> ConfirmationGate {
    ConfirmationGate::new(test_policy())
}
