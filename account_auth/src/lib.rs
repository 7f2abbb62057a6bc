//! # Account Auth
//!
//! Account authentication and token-lifecycle core.
//!
//! Users authenticate with a password or with an identity vouched for by an
//! external provider (Google). A successful login yields a short-lived signed
//! access token and a long-lived opaque refresh token that rotates on every use.
//!
//! ## Core Modules
//!
//! - [`auth`]: Token signing, credential verification, account-merge rules and
//!   the session service
//! - [`db`]: The [`db::AccountStore`] contract with PostgreSQL and in-memory implementations
//!
//! ## Example
//!
//! ```
//! use account_auth::{AuthConfig, TokenSigner};
//! use account_auth::auth::Account;
//!
//! let signer = TokenSigner::new(&AuthConfig::new("0123456789abcdef0123456789abcdef"));
//! let issued = signer.mint_access_token(&Account::new("jo@example.com")).unwrap();
//! assert!(signer.validate_access_token(&issued.token).is_ok());
//! ```

/// Authentication core: tokens, credentials, reconciliation and sessions.
pub mod auth;
pub use auth::{
    AuthConfig, AuthError, AuthResult, AuthSession, AuthSessionService, CancelSignal,
    CredentialVerifier, IdentityClaims, IdentityReconciler, TokenSigner,
};

/// Account persistence.
pub mod db;
pub use db::{AccountStore, Database, DatabaseConfig, InMemoryAccountStore, PgAccountStore};
