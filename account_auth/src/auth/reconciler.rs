//! Account-merge rules for external identities and password registration.

use super::{
    cancel::CancelSignal,
    errors::{AuthError, AuthResult},
    identity::IdentityClaims,
    models::{Account, Profile},
};
use crate::db::{AccountStore, StoreError};
use std::sync::Arc;

/// Outcome of reconciling an external identity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// No account existed; one was created
    Created,
    /// Existing account had empty fields filled or was newly marked provider-confirmed
    Linked,
    /// Existing account already matched; nothing was written
    Unchanged,
}

/// Outcome of a password registration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// Brand new account
    Created,
    /// First password attached to an account created through an external provider
    PasswordAttached,
}

/// Resolves which local account an identity belongs to, and how it may change it
#[derive(Clone)]
pub struct IdentityReconciler {
    store: Arc<dyn AccountStore>,
}

impl IdentityReconciler {
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        Self { store }
    }

    /// Find, create or update the account for a provider-vouched identity
    ///
    /// * no account: create one with `oauth_email_confirmed` set and no password
    /// * existing account: fill only empty profile fields and mark the email
    ///   provider-confirmed; the password hash and `email_confirmed` are never touched
    ///
    /// Issues at most one write, and none when nothing would change.
    pub async fn reconcile_external_identity(
        &self,
        claims: &IdentityClaims,
        cancel: &CancelSignal,
    ) -> AuthResult<(Account, Reconciliation)> {
        if claims.email.trim().is_empty() {
            return Err(AuthError::MissingEmail);
        }

        let existing = cancel
            .guard(async {
                self.store
                    .find_by_email(&claims.email)
                    .await
                    .map_err(AuthError::from)
            })
            .await?;

        if let Some(existing) = &existing {
            let mut merged = existing.clone();
            let profile_changed = merged.fill_missing_profile(&claims.profile());
            if !profile_changed && existing.oauth_email_confirmed {
                return Ok((existing.clone(), Reconciliation::Unchanged));
            }
        }

        let mut candidate = Account::new(claims.email.trim());
        candidate.first_name = claims.first_name.clone();
        candidate.last_name = claims.last_name.clone();
        candidate.avatar_url = claims.avatar_url.clone();
        candidate.oauth_email_confirmed = true;

        cancel.check()?;
        let account = self
            .store
            .upsert_from_external_identity(candidate.clone())
            .await?;

        let outcome = if account.id == candidate.id {
            log::info!("Created account {} from external identity", account.id);
            Reconciliation::Created
        } else {
            log::info!("Linked external identity to account {}", account.id);
            Reconciliation::Linked
        };

        Ok((account, outcome))
    }

    /// Register a password for an email
    ///
    /// * no account: create one carrying the password and profile
    /// * account without a password (external-provider origin): attach the
    ///   password to that same account id
    /// * account with a password: `AuthError::Conflict`
    pub async fn register_password(
        &self,
        email: &str,
        password: &str,
        profile: &Profile,
        cancel: &CancelSignal,
    ) -> AuthResult<(Account, Registration)> {
        let existing = cancel
            .guard(async {
                self.store
                    .find_by_email(email)
                    .await
                    .map_err(AuthError::from)
            })
            .await?;

        match existing {
            Some(account) if account.has_password() => Err(email_taken()),
            Some(account) => {
                cancel.check()?;
                let updated = self
                    .store
                    .attach_password(account.id, password)
                    .await
                    .map_err(registration_error)?;
                log::info!("Attached first password to account {}", updated.id);
                Ok((updated, Registration::PasswordAttached))
            }
            None => {
                let mut account = Account::new(email.trim());
                account.first_name = profile.first_name.clone();
                account.last_name = profile.last_name.clone();
                account.avatar_url = profile.avatar_url.clone();

                cancel.check()?;
                let created = self
                    .store
                    .create(account, Some(password))
                    .await
                    .map_err(registration_error)?;
                log::info!("Registered account {}", created.id);
                Ok((created, Registration::Created))
            }
        }
    }
}

fn email_taken() -> AuthError {
    AuthError::Conflict("An account with this email already has a password".to_string())
}

/// A concurrent writer won the race between our read and our write.
fn registration_error(err: StoreError) -> AuthError {
    match err {
        StoreError::Conflict(_) => email_taken(),
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryAccountStore;

    fn reconciler() -> (IdentityReconciler, Arc<InMemoryAccountStore>) {
        let store = Arc::new(InMemoryAccountStore::default());
        (IdentityReconciler::new(store.clone()), store)
    }

    fn claims(email: &str, first: Option<&str>) -> IdentityClaims {
        IdentityClaims::new(Some(email), first, Some("Lee"), Some("http://img")).unwrap()
    }

    fn profile() -> Profile {
        Profile {
            first_name: Some("Jo".to_string()),
            last_name: Some("Lee".to_string()),
            avatar_url: None,
        }
    }

    #[tokio::test]
    async fn test_external_identity_created_then_unchanged() {
        let (reconciler, store) = reconciler();
        let never = CancelSignal::never();

        let (created, outcome) = reconciler
            .reconcile_external_identity(&claims("b@x.com", Some("Jo")), &never)
            .await
            .unwrap();
        assert_eq!(outcome, Reconciliation::Created);
        assert!(created.oauth_email_confirmed);
        assert!(!created.has_password());

        let (again, outcome) = reconciler
            .reconcile_external_identity(&claims("b@x.com", Some("Jo")), &never)
            .await
            .unwrap();
        assert_eq!(outcome, Reconciliation::Unchanged);
        assert_eq!(again.id, created.id);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_external_identity_never_blanks_names() {
        let (reconciler, _) = reconciler();
        let never = CancelSignal::never();

        let (created, _) = reconciler
            .reconcile_external_identity(&claims("b@x.com", Some("Jo")), &never)
            .await
            .unwrap();

        let (again, _) = reconciler
            .reconcile_external_identity(&claims("b@x.com", Some("")), &never)
            .await
            .unwrap();
        assert_eq!(again.id, created.id);
        assert_eq!(again.first_name.as_deref(), Some("Jo"));
    }

    #[tokio::test]
    async fn test_external_identity_links_password_account() {
        let (reconciler, _) = reconciler();
        let never = CancelSignal::never();

        let (registered, _) = reconciler
            .register_password("c@x.com", "Str0ng#Pass", &profile(), &never)
            .await
            .unwrap();

        let (linked, outcome) = reconciler
            .reconcile_external_identity(&claims("C@x.com", Some("Other")), &never)
            .await
            .unwrap();
        assert_eq!(outcome, Reconciliation::Linked);
        assert_eq!(linked.id, registered.id);
        assert_eq!(linked.first_name.as_deref(), Some("Jo"));
        assert_eq!(linked.avatar_url.as_deref(), Some("http://img"));
        assert_eq!(linked.password_hash, registered.password_hash);
        assert!(linked.oauth_email_confirmed);
    }

    #[tokio::test]
    async fn test_register_conflicts_with_existing_password() {
        let (reconciler, _) = reconciler();
        let never = CancelSignal::never();

        reconciler
            .register_password("d@x.com", "Str0ng#Pass", &profile(), &never)
            .await
            .unwrap();
        let result = reconciler
            .register_password("D@X.com", "Other#Pass1", &profile(), &never)
            .await;
        assert!(matches!(result, Err(AuthError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_register_attaches_to_external_account() {
        let (reconciler, store) = reconciler();
        let never = CancelSignal::never();

        let (external, _) = reconciler
            .reconcile_external_identity(&claims("e@x.com", Some("Jo")), &never)
            .await
            .unwrap();
        let (registered, outcome) = reconciler
            .register_password("e@x.com", "Str0ng#Pass", &profile(), &never)
            .await
            .unwrap();

        assert_eq!(outcome, Registration::PasswordAttached);
        assert_eq!(registered.id, external.id);
        assert!(registered.has_password());
        assert!(registered.oauth_email_confirmed);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_write() {
        let (reconciler, store) = reconciler();
        let (handle, signal) = CancelSignal::new();
        handle.cancel();

        let result = reconciler
            .reconcile_external_identity(&claims("f@x.com", None), &signal)
            .await;
        assert!(matches!(result, Err(AuthError::Cancelled)));

        let result = reconciler
            .register_password("f@x.com", "Str0ng#Pass", &profile(), &signal)
            .await;
        assert!(matches!(result, Err(AuthError::Cancelled)));
        assert!(store.is_empty().await);
    }
}
