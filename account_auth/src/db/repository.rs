//! Account store contract and its PostgreSQL implementation.
//!
//! The authentication core only ever talks to [`AccountStore`]; any backend
//! that enforces email uniqueness atomically can sit behind it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};
use std::time::Duration;
use thiserror::Error;

use super::timeouts::with_default_timeout;
use crate::auth::{
    credentials::CredentialVerifier,
    models::{Account, AccountId},
    signer::digests_match,
};

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Query exceeded its timeout
    #[error("Store operation timed out after {0:?}")]
    Timeout(Duration),

    /// Uniqueness or precondition violated
    #[error("Conflict: {0}")]
    Conflict(String),

    /// No account with this id
    #[error("Account not found: {0}")]
    NotFound(AccountId),

    /// Password hashing failed
    #[error("Password hashing failed: {0}")]
    Hashing(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Durable storage of accounts and refresh-token state
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Find account by email (case-insensitive)
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Account>>;

    /// Find account by ID
    async fn find_by_id(&self, id: AccountId) -> StoreResult<Option<Account>>;

    /// Insert a new account, hashing `password` when given.
    ///
    /// Fails with `StoreError::Conflict` if the email is already taken.
    async fn create(&self, account: Account, password: Option<&str>) -> StoreResult<Account>;

    /// Insert the account, or merge it into the existing one with the same email.
    ///
    /// On merge only empty profile fields are filled and `oauth_email_confirmed`
    /// is set; the password hash, `email_confirmed` and refresh state are untouched.
    async fn upsert_from_external_identity(&self, account: Account) -> StoreResult<Account>;

    /// Set the first password of an account that has none.
    ///
    /// Fails with `StoreError::Conflict` if a password is already set and
    /// `StoreError::NotFound` if the account does not exist.
    async fn attach_password(&self, id: AccountId, password: &str) -> StoreResult<Account>;

    /// Replace the account's refresh-token hash (last writer wins)
    async fn save_refresh_token(
        &self,
        id: AccountId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()>;

    /// True if `token_hash` matches the live, unexpired refresh token of the account
    async fn validate_refresh_token(&self, id: AccountId, token_hash: &str) -> StoreResult<bool>;

    /// Verifier used for hashing and checking passwords
    fn credentials(&self) -> &CredentialVerifier;

    /// Check a plaintext password against the stored hash
    async fn verify_password(&self, account: &Account, password: &str) -> StoreResult<bool> {
        Ok(self.credentials().verify(account, password))
    }

    /// Spend a password check's worth of work for an email with no account.
    ///
    /// Always false.
    async fn verify_absent_password(&self, password: &str) -> StoreResult<bool> {
        Ok(self.credentials().verify_decoy(password))
    }
}

/// Shared refresh-token liveness rule for every store implementation
pub(crate) fn refresh_token_is_live(
    stored_hash: Option<&str>,
    expires_at: Option<DateTime<Utc>>,
    presented_hash: &str,
    now: DateTime<Utc>,
) -> bool {
    match (stored_hash, expires_at) {
        (Some(stored), Some(expires_at)) => {
            expires_at > now && digests_match(stored, presented_hash)
        }
        _ => false,
    }
}

pub(crate) fn hash_with(credentials: &CredentialVerifier, password: &str) -> StoreResult<String> {
    credentials
        .hash_password(password)
        .map_err(|e| StoreError::Hashing(e.to_string()))
}

const ACCOUNT_COLUMNS: &str = "id, email, first_name, last_name, avatar_url, password_hash, \
     email_confirmed, oauth_email_confirmed, refresh_token_hash, refresh_token_expires_at, \
     created_at, updated_at";

fn account_from_row(row: &PgRow) -> Result<Account, sqlx::Error> {
    Ok(Account {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        avatar_url: row.try_get("avatar_url")?,
        password_hash: row.try_get("password_hash")?,
        email_confirmed: row.try_get("email_confirmed")?,
        oauth_email_confirmed: row.try_get("oauth_email_confirmed")?,
        refresh_token_hash: row.try_get("refresh_token_hash")?,
        refresh_token_expires_at: row.try_get("refresh_token_expires_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// PostgreSQL implementation of `AccountStore`
pub struct PgAccountStore {
    pool: PgPool,
    credentials: CredentialVerifier,
}

impl PgAccountStore {
    pub fn new(pool: PgPool, credentials: CredentialVerifier) -> Self {
        Self { pool, credentials }
    }

    async fn exists(&self, id: AccountId) -> StoreResult<bool> {
        let row = with_default_timeout(
            sqlx::query("SELECT 1 FROM accounts WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool),
        )
        .await?;
        Ok(row.is_some())
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email_normalized = $1");
        let row = with_default_timeout(
            sqlx::query(&sql)
                .bind(crate::auth::models::normalize_email(email))
                .fetch_optional(&self.pool),
        )
        .await?;

        Ok(row.as_ref().map(account_from_row).transpose()?)
    }

    async fn find_by_id(&self, id: AccountId) -> StoreResult<Option<Account>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1");
        let row =
            with_default_timeout(sqlx::query(&sql).bind(id).fetch_optional(&self.pool)).await?;

        Ok(row.as_ref().map(account_from_row).transpose()?)
    }

    async fn create(&self, account: Account, password: Option<&str>) -> StoreResult<Account> {
        let password_hash = match password {
            Some(password) => Some(hash_with(&self.credentials, password)?),
            None => account.password_hash.clone(),
        };

        let sql = format!(
            r#"
            INSERT INTO accounts (id, email, email_normalized, first_name, last_name, avatar_url,
                                  password_hash, email_confirmed, oauth_email_confirmed,
                                  created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NOW(), NOW())
            ON CONFLICT (email_normalized) DO NOTHING
            RETURNING {ACCOUNT_COLUMNS}
            "#
        );

        let row = with_default_timeout(
            sqlx::query(&sql)
                .bind(account.id)
                .bind(account.email.trim())
                .bind(account.normalized_email())
                .bind(&account.first_name)
                .bind(&account.last_name)
                .bind(&account.avatar_url)
                .bind(&password_hash)
                .bind(account.email_confirmed)
                .bind(account.oauth_email_confirmed)
                .fetch_optional(&self.pool),
        )
        .await?;

        match row {
            Some(row) => {
                log::debug!("Inserted account {}", account.id);
                Ok(account_from_row(&row)?)
            }
            None => Err(StoreError::Conflict("Email already registered".to_string())),
        }
    }

    async fn upsert_from_external_identity(&self, account: Account) -> StoreResult<Account> {
        let sql = format!(
            r#"
            INSERT INTO accounts (id, email, email_normalized, first_name, last_name, avatar_url,
                                  email_confirmed, oauth_email_confirmed, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, FALSE, TRUE, NOW(), NOW())
            ON CONFLICT (email_normalized) DO UPDATE SET
                first_name = COALESCE(NULLIF(BTRIM(accounts.first_name), ''), EXCLUDED.first_name),
                last_name = COALESCE(NULLIF(BTRIM(accounts.last_name), ''), EXCLUDED.last_name),
                avatar_url = COALESCE(NULLIF(BTRIM(accounts.avatar_url), ''), EXCLUDED.avatar_url),
                oauth_email_confirmed = TRUE,
                updated_at = NOW()
            RETURNING {ACCOUNT_COLUMNS}
            "#
        );

        let row = with_default_timeout(
            sqlx::query(&sql)
                .bind(account.id)
                .bind(account.email.trim())
                .bind(account.normalized_email())
                .bind(&account.first_name)
                .bind(&account.last_name)
                .bind(&account.avatar_url)
                .fetch_one(&self.pool),
        )
        .await?;

        Ok(account_from_row(&row)?)
    }

    async fn attach_password(&self, id: AccountId, password: &str) -> StoreResult<Account> {
        let password_hash = hash_with(&self.credentials, password)?;

        let sql = format!(
            r#"
            UPDATE accounts
            SET password_hash = $2, updated_at = NOW()
            WHERE id = $1 AND password_hash IS NULL
            RETURNING {ACCOUNT_COLUMNS}
            "#
        );

        let row = with_default_timeout(
            sqlx::query(&sql)
                .bind(id)
                .bind(&password_hash)
                .fetch_optional(&self.pool),
        )
        .await?;

        let Some(row) = row else {
            if self.exists(id).await? {
                return Err(StoreError::Conflict(
                    "Account already has a password".to_string(),
                ));
            }
            return Err(StoreError::NotFound(id));
        };

        Ok(account_from_row(&row)?)
    }

    async fn save_refresh_token(
        &self,
        id: AccountId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let result = with_default_timeout(
            sqlx::query(
                r#"
                UPDATE accounts
                SET refresh_token_hash = $2, refresh_token_expires_at = $3, updated_at = NOW()
                WHERE id = $1
                "#,
            )
            .bind(id)
            .bind(token_hash)
            .bind(expires_at)
            .execute(&self.pool),
        )
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    async fn validate_refresh_token(&self, id: AccountId, token_hash: &str) -> StoreResult<bool> {
        let row = with_default_timeout(
            sqlx::query(
                "SELECT refresh_token_hash, refresh_token_expires_at FROM accounts WHERE id = $1",
            )
            .bind(id)
            .fetch_optional(&self.pool),
        )
        .await?;

        let Some(row) = row else {
            return Ok(false);
        };

        let stored: Option<String> = row.try_get("refresh_token_hash")?;
        let expires_at: Option<DateTime<Utc>> = row.try_get("refresh_token_expires_at")?;

        Ok(refresh_token_is_live(
            stored.as_deref(),
            expires_at,
            token_hash,
            Utc::now(),
        ))
    }

    fn credentials(&self) -> &CredentialVerifier {
        &self.credentials
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::signer::TokenSigner;
    use chrono::Duration as ChronoDuration;

    #[test]
    fn test_refresh_token_liveness() {
        let now = Utc::now();
        let digest = TokenSigner::hash("secret");

        assert!(refresh_token_is_live(
            Some(&digest),
            Some(now + ChronoDuration::days(1)),
            &digest,
            now
        ));
        assert!(!refresh_token_is_live(
            Some(&digest),
            Some(now - ChronoDuration::seconds(1)),
            &digest,
            now
        ));
        assert!(!refresh_token_is_live(
            Some(&digest),
            Some(now + ChronoDuration::days(1)),
            &TokenSigner::hash("other"),
            now
        ));
        assert!(!refresh_token_is_live(None, None, &digest, now));
        assert!(!refresh_token_is_live(Some(&digest), None, &digest, now));
    }

    #[test]
    fn test_store_error_display() {
        let err = StoreError::Conflict("Email already registered".to_string());
        assert!(err.to_string().contains("Email already registered"));
    }
}
