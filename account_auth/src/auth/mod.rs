//! Authentication module providing password login, registration, external
//! identity login and refresh-token rotation.
//!
//! This module implements:
//! - Argon2id password hashing with server-side pepper
//! - HS256 JWT access tokens (15-minute expiry by default)
//! - Rotating opaque refresh tokens stored only as SHA-256 digests (15-day expiry by default)
//! - Account-merge rules that keep one login method from overwriting another's state
//!
//! ## Example
//!
//! ```no_run
//! use account_auth::auth::{AuthConfig, AuthSessionService, CancelSignal, LoginRequest};
//! use account_auth::db::InMemoryAccountStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AuthConfig::from_env()?;
//!     let store = Arc::new(InMemoryAccountStore::default());
//!     let auth = AuthSessionService::new(store, &config);
//!
//!     let request = LoginRequest {
//!         email: "jo@example.com".to_string(),
//!         password: "Str0ng#Pass".to_string(),
//!     };
//!
//!     let session = auth.login_with_password(request, &CancelSignal::never()).await?;
//!     println!("Logged in account {}", session.account_id);
//!     Ok(())
//! }
//! ```

pub mod cancel;
pub mod config;
pub mod credentials;
pub mod errors;
pub mod identity;
pub mod models;
pub mod reconciler;
pub mod service;
pub mod signer;
pub mod validation;

pub use cancel::{CancelHandle, CancelSignal};
pub use config::{AuthConfig, ConfigError};
pub use credentials::CredentialVerifier;
pub use errors::{AuthError, AuthResult, ErrorKind};
pub use identity::{GoogleIdTokenPayload, IdentityClaims};
pub use models::{
    AccessTokenClaims, Account, AccountId, AuthSession, LoginRequest, Profile, RegisterRequest,
};
pub use reconciler::{IdentityReconciler, Reconciliation, Registration};
pub use service::AuthSessionService;
pub use signer::{IssuedAccessToken, RefreshSecret, TokenSigner};
