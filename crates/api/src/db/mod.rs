//! Database operations for the shop `PostgreSQL` schema.
//!
//! # Tables (schema `shop`)
//!
//! - `user` - Accounts (password and/or OAuth identity, optional shipping address document)
//! - `product` - Catalog with a generated, weighted `tsvector` for search
//! - `cart` - One cart document per user or guest token (`items` is JSONB)
//! - `order` - Order documents (`items` and `shipping_address` are JSONB)
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p shopfront-cli -- migrate
//! ```

pub mod carts;
pub mod orders;
pub mod products;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use thiserror::Error;

pub use carts::{CartOwner, CartRepository};
pub use orders::{NewOrder, OrderRepository};
pub use products::{ProductFilter, ProductRepository};
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map a unique-constraint violation to `Conflict`, anything else to `Database`.
    pub(crate) fn from_unique(err: sqlx::Error, message: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && db_err.is_unique_violation()
        {
            return Self::Conflict(message.to_owned());
        }
        Self::Database(err)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    pool_options()
        .connect_with(connect_options(database_url)?)
        .await
}

/// Create a pool that connects on first use.
///
/// Used by router tests, which never reach the database.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection string cannot be parsed.
pub fn create_lazy_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    Ok(pool_options()
        .min_connections(0)
        .connect_lazy_with(connect_options(database_url)?))
}

/// Parse the URL and put the `shop` schema on every session's `search_path`.
///
/// `public` stays first so the `_sqlx_migrations` table is created there
/// before the `shop` schema exists and found there afterwards; the enum
/// types only exist in `shop`, so `user_role` and friends still resolve.
fn connect_options(database_url: &secrecy::SecretString) -> Result<PgConnectOptions, sqlx::Error> {
    Ok(database_url
        .expose_secret()
        .parse::<PgConnectOptions>()?
        .options([("search_path", SEARCH_PATH)]))
}

const SEARCH_PATH: &str = "public,shop";

fn pool_options() -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
}
