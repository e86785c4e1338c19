//! # SQLite query functions
//!
//! Plain functions that take a `&mut SqliteConnection`. Pass a pooled connection for one-off reads, or `&mut *tx`
//! to run several of them inside one atomic transaction.
use std::env;

use log::*;
use sqlx::{sqlite::SqlitePoolOptions, Error as SqlxError, SqlitePool};

pub mod ledger;
pub mod marketplace;
pub mod orders;

const SQLITE_DB_URL: &str = "sqlite://data/marketplace.db";

pub fn db_url() -> String {
    let result = env::var("MSE_DATABASE_URL").unwrap_or_else(|_| {
        info!("🗃️ MSE_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("🗃️ Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
    Ok(pool)
}
