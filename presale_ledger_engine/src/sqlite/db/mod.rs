//! # SQLite database methods
//!
//! "Low-level" SQLite interactions, maintained as plain functions (rather than stateful structs)
//! that accept a `&mut SqliteConnection`. Callers can obtain a connection from a pool, or open an
//! atomic transaction and pass `&mut *tx` without any other changes — the credit transaction in
//! [`SqliteDatabase`](crate::sqlite::SqliteDatabase) relies on exactly that.
use std::env;

use log::info;
use sqlx::{sqlite::SqlitePoolOptions, Error as SqlxError, SqlitePool};

pub mod accounts;
pub mod commissions;
pub mod contributions;
pub mod metrics;
pub mod payments;

const SQLITE_DB_URL: &str = "sqlite://data/plg_store.db";

pub fn db_url() -> String {
    let result = env::var("PLG_DATABASE_URL").unwrap_or_else(|_| {
        info!("PLG_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
    Ok(pool)
}
