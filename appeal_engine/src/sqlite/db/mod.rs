//! # SQLite database methods
//!
//! This module contains the "low-level" SQLite database interactions.
//!
//! All of them are plain functions (rather than stateful structs) that accept a `&mut SqliteConnection` argument.
//! Callers can obtain a connection from a pool, or open a transaction when several writes must be atomic, and call
//! through to the functions without any other changes.
//!
//! Timestamps are always bound from Rust as UTC, so they are stored in a single RFC 3339 format and compare correctly
//! as text.
//!
//! `INSERT` and `UPDATE` statements with a `RETURNING` clause are always read with `fetch_all`. SQLite only finishes
//! an auto-commit write once the statement has been stepped to completion, and `fetch_one`/`fetch_optional` stop
//! after the first row. Until then, other connections in the pool do not see the write.
use std::env;

use log::info;
use sqlx::{sqlite::SqlitePoolOptions, Error as SqlxError, SqlitePool};

pub mod audit;
pub mod leads;
pub mod orders;
pub mod prechecks;
pub mod properties;
pub mod reports;
pub mod rule_packs;
pub mod system_config;

const SQLITE_DB_URL: &str = "sqlite://data/appeal_store.db";

pub fn db_url() -> String {
    let result = env::var("APPEAL_DATABASE_URL").unwrap_or_else(|_| {
        info!("🗃️ APPEAL_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("🗃️ Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
    Ok(pool)
}
