//! Database module providing PostgreSQL connection pooling and the account store.
//!
//! This module manages the database connection pool using sqlx and exposes
//! the [`AccountStore`] contract the authentication core depends on, with a
//! PostgreSQL and an in-memory implementation.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

pub mod config;
pub mod memory;
pub mod repository;
pub mod timeouts;

pub use config::DatabaseConfig;
pub use memory::InMemoryAccountStore;
pub use repository::{AccountStore, PgAccountStore, StoreError, StoreResult};

const SCHEMA: &str = include_str!("schema.sql");

/// Database connection pool wrapper
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use account_auth::db::{Database, DatabaseConfig};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let config = DatabaseConfig::from_env()?;
    ///     let db = Database::new(&config).await?;
    ///     db.migrate().await?;
    ///     Ok(())
    /// }
    /// ```
    pub async fn new(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .connect(&config.database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the `accounts` table if it does not exist
    pub async fn migrate(&self) -> StoreResult<()> {
        timeouts::with_timeout(
            timeouts::MIGRATION_TIMEOUT,
            sqlx::raw_sql(SCHEMA).execute(&self.pool),
        )
        .await?;
        log::info!("Account schema is up to date");
        Ok(())
    }

    /// Check if the database connection is healthy
    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Close the database connection pool
    pub async fn close(self) {
        self.pool.close().await;
    }
}
