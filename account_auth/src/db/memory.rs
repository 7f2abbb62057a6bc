//! In-process `AccountStore`, used by tests and local tooling.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::repository::{
    AccountStore, StoreError, StoreResult, hash_with, refresh_token_is_live,
};
use crate::auth::{
    credentials::CredentialVerifier,
    models::{Account, AccountId, normalize_email},
};

#[derive(Default)]
struct State {
    accounts: HashMap<AccountId, Account>,
    by_email: HashMap<String, AccountId>,
}

/// `AccountStore` backed by a single lock over two maps.
///
/// Holding one write lock across check-and-insert gives the same atomic
/// email uniqueness a database constraint would.
#[derive(Clone)]
pub struct InMemoryAccountStore {
    state: Arc<RwLock<State>>,
    credentials: CredentialVerifier,
}

impl Default for InMemoryAccountStore {
    fn default() -> Self {
        Self::new(CredentialVerifier::new(""))
    }
}

impl InMemoryAccountStore {
    pub fn new(credentials: CredentialVerifier) -> Self {
        Self {
            state: Arc::new(RwLock::new(State::default())),
            credentials,
        }
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.accounts.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        let state = self.state.read().await;
        Ok(state
            .by_email
            .get(&normalize_email(email))
            .and_then(|id| state.accounts.get(id))
            .cloned())
    }

    async fn find_by_id(&self, id: AccountId) -> StoreResult<Option<Account>> {
        Ok(self.state.read().await.accounts.get(&id).cloned())
    }

    async fn create(&self, mut account: Account, password: Option<&str>) -> StoreResult<Account> {
        if let Some(password) = password {
            account.password_hash = Some(hash_with(&self.credentials, password)?);
        }
        account.email = account.email.trim().to_string();

        let key = account.normalized_email();
        let mut state = self.state.write().await;
        if state.by_email.contains_key(&key) {
            return Err(StoreError::Conflict("Email already registered".to_string()));
        }

        let now = Utc::now();
        account.created_at = now;
        account.updated_at = now;
        state.by_email.insert(key, account.id);
        state.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn upsert_from_external_identity(&self, mut account: Account) -> StoreResult<Account> {
        let key = account.normalized_email();
        let now = Utc::now();
        let mut state = self.state.write().await;

        if let Some(existing_id) = state.by_email.get(&key).copied() {
            let existing = state
                .accounts
                .get_mut(&existing_id)
                .ok_or(StoreError::NotFound(existing_id))?;
            existing.fill_missing_profile(&account.profile());
            existing.oauth_email_confirmed = true;
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        account.email = account.email.trim().to_string();
        account.password_hash = None;
        account.email_confirmed = false;
        account.oauth_email_confirmed = true;
        account.refresh_token_hash = None;
        account.refresh_token_expires_at = None;
        account.created_at = now;
        account.updated_at = now;
        state.by_email.insert(key, account.id);
        state.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn attach_password(&self, id: AccountId, password: &str) -> StoreResult<Account> {
        let password_hash = hash_with(&self.credentials, password)?;

        let mut state = self.state.write().await;
        let account = state.accounts.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        if account.password_hash.is_some() {
            return Err(StoreError::Conflict(
                "Account already has a password".to_string(),
            ));
        }

        account.password_hash = Some(password_hash);
        account.updated_at = Utc::now();
        Ok(account.clone())
    }

    async fn save_refresh_token(
        &self,
        id: AccountId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let account = state.accounts.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        account.refresh_token_hash = Some(token_hash.to_string());
        account.refresh_token_expires_at = Some(expires_at);
        account.updated_at = Utc::now();
        Ok(())
    }

    async fn validate_refresh_token(&self, id: AccountId, token_hash: &str) -> StoreResult<bool> {
        let state = self.state.read().await;
        Ok(state.accounts.get(&id).is_some_and(|account| {
            refresh_token_is_live(
                account.refresh_token_hash.as_deref(),
                account.refresh_token_expires_at,
                token_hash,
                Utc::now(),
            )
        }))
    }

    fn credentials(&self) -> &CredentialVerifier {
        &self.credentials
    }
}
