//! Authentication session service: password login, registration, OAuth login
//! and refresh rotation.

use super::{
    cancel::CancelSignal,
    config::AuthConfig,
    errors::{AuthError, AuthResult},
    identity::IdentityClaims,
    models::{AccessTokenClaims, Account, AuthSession, LoginRequest, Profile, RegisterRequest},
    reconciler::IdentityReconciler,
    signer::TokenSigner,
    validation::{validate_login, validate_registration},
};
use crate::db::AccountStore;
use std::sync::Arc;

/// Authentication session service
///
/// Holds no per-request state; every durable change goes through the store.
#[derive(Clone)]
pub struct AuthSessionService {
    store: Arc<dyn AccountStore>,
    signer: TokenSigner,
    reconciler: IdentityReconciler,
}

impl AuthSessionService {
    /// Create a new session service
    ///
    /// # Arguments
    ///
    /// * `store` - Account store
    /// * `config` - Signing secret, issuer, audience and token lifetimes
    pub fn new(store: Arc<dyn AccountStore>, config: &AuthConfig) -> Self {
        Self {
            reconciler: IdentityReconciler::new(store.clone()),
            signer: TokenSigner::new(config),
            store,
        }
    }

    pub fn signer(&self) -> &TokenSigner {
        &self.signer
    }

    /// Login with email and password
    ///
    /// # Errors
    ///
    /// * `AuthError::Validation` - Empty email or password
    /// * `AuthError::InvalidCredentials` - Unknown email or wrong password, indistinguishably
    /// * `AuthError::Cancelled` - Signal fired before the session was stored
    pub async fn login_with_password(
        &self,
        request: LoginRequest,
        cancel: &CancelSignal,
    ) -> AuthResult<AuthSession> {
        validate_login(&request)?;

        let account = cancel
            .guard(async {
                self.store
                    .find_by_email(&request.email)
                    .await
                    .map_err(AuthError::from)
            })
            .await?;

        let Some(account) = account else {
            cancel
                .guard(async {
                    self.store
                        .verify_absent_password(&request.password)
                        .await
                        .map_err(AuthError::from)
                })
                .await?;
            log::warn!("Password login rejected");
            return Err(AuthError::InvalidCredentials);
        };

        // Accounts without a password (external-provider origin) fail here too.
        let verified = cancel
            .guard(async {
                self.store
                    .verify_password(&account, &request.password)
                    .await
                    .map_err(AuthError::from)
            })
            .await?;
        if !verified {
            log::warn!("Password login rejected");
            return Err(AuthError::InvalidCredentials);
        }

        let session = self.issue_session(&account, cancel).await?;
        log::info!("Account {} logged in with password", account.id);
        Ok(session)
    }

    /// Register a password account, or attach a first password to an
    /// account created through an external provider
    ///
    /// Issues no tokens; the caller logs in afterwards.
    ///
    /// # Errors
    ///
    /// * `AuthError::Validation` - Malformed names, email or weak password
    /// * `AuthError::Conflict` - Email already has a password
    /// * `AuthError::Cancelled` - Signal fired before the write
    pub async fn register_with_password(
        &self,
        request: RegisterRequest,
        cancel: &CancelSignal,
    ) -> AuthResult<Account> {
        validate_registration(&request)?;

        let profile = Profile {
            first_name: Some(request.first_name.trim().to_string()),
            last_name: Some(request.last_name.trim().to_string()),
            avatar_url: None,
        };

        let (account, _) = self
            .reconciler
            .register_password(&request.email, &request.password, &profile, cancel)
            .await?;
        Ok(account)
    }

    /// Login through an external identity, creating or linking the account
    ///
    /// # Errors
    ///
    /// * `AuthError::MissingEmail` - Claims carry no email
    /// * `AuthError::Cancelled` - Signal fired before a write
    pub async fn login_or_register_with_oauth(
        &self,
        claims: IdentityClaims,
        cancel: &CancelSignal,
    ) -> AuthResult<AuthSession> {
        let (account, outcome) = self
            .reconciler
            .reconcile_external_identity(&claims, cancel)
            .await?;

        let session = self.issue_session(&account, cancel).await?;
        log::info!(
            "Account {} logged in via external identity ({:?})",
            account.id,
            outcome
        );
        Ok(session)
    }

    /// Exchange a (possibly expired) access token plus its refresh secret for a
    /// new pair. The presented refresh secret stops validating afterwards.
    ///
    /// # Errors
    ///
    /// * `AuthError::InvalidToken` - Access token forged or for another issuer/audience
    /// * `AuthError::InvalidRefreshToken` - Refresh secret mismatched, expired or absent,
    ///   or the account no longer exists
    pub async fn refresh_session(
        &self,
        access_token: &str,
        refresh_token: &str,
        cancel: &CancelSignal,
    ) -> AuthResult<AuthSession> {
        let claims = self.signer.claims_from_expired_token(access_token)?;
        let account_id = claims.account_id().ok_or(AuthError::InvalidToken)?;

        let account = cancel
            .guard(async {
                self.store
                    .find_by_id(account_id)
                    .await
                    .map_err(AuthError::from)
            })
            .await?
            .ok_or(AuthError::InvalidRefreshToken)?;

        let presented = TokenSigner::hash(refresh_token);
        let live = cancel
            .guard(async {
                self.store
                    .validate_refresh_token(account.id, &presented)
                    .await
                    .map_err(AuthError::from)
            })
            .await?;
        if !live {
            log::warn!("Refresh rejected for account {}", account.id);
            return Err(AuthError::InvalidRefreshToken);
        }

        let session = self.issue_session(&account, cancel).await?;
        log::debug!("Rotated refresh token for account {}", account.id);
        Ok(session)
    }

    /// Validate an access token, including expiry
    pub fn validate_access_token(&self, token: &str) -> AuthResult<AccessTokenClaims> {
        self.signer.validate_access_token(token)
    }

    /// Mint an access token and a refresh secret, and persist the secret's digest
    async fn issue_session(
        &self,
        account: &Account,
        cancel: &CancelSignal,
    ) -> AuthResult<AuthSession> {
        let access = self.signer.mint_access_token(account)?;
        let refresh = self.signer.generate_refresh_secret();
        let digest = TokenSigner::hash(&refresh.secret);

        cancel.check()?;
        self.store
            .save_refresh_token(account.id, &digest, refresh.expires_at)
            .await?;

        Ok(AuthSession {
            account_id: account.id,
            email: account.email.clone(),
            first_name: account.first_name.clone(),
            last_name: account.last_name.clone(),
            avatar_url: account.avatar_url.clone(),
            email_confirmed: account.email_confirmed,
            oauth_email_confirmed: account.oauth_email_confirmed,
            access_token: access.token,
            access_token_expires_at: access.expires_at,
            refresh_token: refresh.secret,
            refresh_token_expires_at: refresh.expires_at,
        })
    }
}
