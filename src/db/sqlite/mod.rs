//! # SQLite database methods
//!
//! This module contains the "low-level" SQLite interactions behind the storage traits.
//!
//! The interactions are maintained by simple functions (rather than stateful structs) that accept a
//! `&mut SqliteConnection` argument. Callers can obtain a connection from a pool, or create an atomic transaction
//! as the need arises, and call through without any other changes.
use std::env;

use log::info;
use sqlx::{sqlite::SqlitePoolOptions, Error as SqlxError, SqlitePool};

mod sqlite_impl;

pub mod chat_rooms;
pub mod profiles;
pub mod roles;

pub use sqlite_impl::SqliteDatabase;

const SQLITE_DB_URL: &str = "sqlite://data/support_chat.db";

pub fn db_url() -> String {
    let result = env::var("SME_DATABASE_URL").unwrap_or_else(|_| {
        info!("SME_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
    Ok(pool)
}
