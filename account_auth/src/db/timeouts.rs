//! Database query timeout helpers
//!
//! Every PostgreSQL store query runs under one of these so that a stalled
//! connection surfaces as `StoreError::Timeout` instead of hanging a login.

use super::repository::{StoreError, StoreResult};
use std::time::Duration;
use tokio::time::timeout;

/// Default timeout for database queries (5 seconds)
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout for schema migration (30 seconds)
pub const MIGRATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Execute a query with timeout
///
/// # Example
///
/// ```no_run
/// use account_auth::db::timeouts::{with_timeout, DEFAULT_QUERY_TIMEOUT};
/// # use sqlx::PgPool;
/// # async fn example(pool: &PgPool) -> Result<(), Box<dyn std::error::Error>> {
///
/// let row = with_timeout(
///     DEFAULT_QUERY_TIMEOUT,
///     sqlx::query("SELECT id FROM accounts WHERE email_normalized = $1")
///         .bind("a@x.com")
///         .fetch_optional(pool)
/// ).await?;
///
/// # Ok(())
/// # }
/// ```
pub async fn with_timeout<F, T>(duration: Duration, future: F) -> StoreResult<T>
where
    F: std::future::Future<Output = Result<T, sqlx::Error>>,
{
    match timeout(duration, future).await {
        Ok(result) => result.map_err(StoreError::Database),
        Err(_) => {
            log::warn!("Database operation timed out after {:?}", duration);
            Err(StoreError::Timeout(duration))
        }
    }
}

/// Execute a query with default timeout (5 seconds)
pub async fn with_default_timeout<F, T>(future: F) -> StoreResult<T>
where
    F: std::future::Future<Output = Result<T, sqlx::Error>>,
{
    with_timeout(DEFAULT_QUERY_TIMEOUT, future).await
}
