//! Authentication error types.

use crate::db::StoreError;
use thiserror::Error;

use super::models::AccountId;

/// Message shared by every password-login failure.
///
/// Unknown email and wrong password must be indistinguishable to a caller.
pub const LOGIN_FAILED_MESSAGE: &str = "Failed to login, check your credentials and try again";

/// Coarse error classification handed to transport layers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Unauthenticated,
    Conflict,
    NotFound,
    Validation,
    Cancelled,
    Internal,
}

/// Authentication errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown email or wrong password
    #[error("{}", LOGIN_FAILED_MESSAGE)]
    InvalidCredentials,

    /// Identity provider did not supply an email address
    #[error("Email not provided by identity provider")]
    MissingEmail,

    /// Identity provider explicitly reported the email as unverified
    #[error("Email not verified by identity provider")]
    UnverifiedEmail,

    /// Access token failed signature, issuer, audience or expiry checks
    #[error("Invalid token")]
    InvalidToken,

    /// Refresh token missing, mismatched or expired
    #[error("Invalid refresh token")]
    InvalidRefreshToken,

    /// Token signing failed
    #[error("Token signing failed: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),

    /// Email already carries credentials
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Account not found
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// Malformed input
    #[error("Invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    /// Cancellation signal fired before the operation completed
    #[error("Operation cancelled")]
    Cancelled,

    /// Password hashing failed
    #[error("Password hashing failed")]
    HashingFailed,

    /// Storage failure
    #[error("Store error: {0}")]
    Store(#[source] StoreError),
}

impl AuthError {
    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        AuthError::Validation {
            field,
            reason: reason.into(),
        }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::InvalidCredentials
            | AuthError::MissingEmail
            | AuthError::UnverifiedEmail
            | AuthError::InvalidToken
            | AuthError::InvalidRefreshToken
            | AuthError::Signing(_) => ErrorKind::Unauthenticated,
            AuthError::Conflict(_) => ErrorKind::Conflict,
            AuthError::AccountNotFound(_) => ErrorKind::NotFound,
            AuthError::Validation { .. } => ErrorKind::Validation,
            AuthError::Cancelled => ErrorKind::Cancelled,
            AuthError::HashingFailed | AuthError::Store(_) => ErrorKind::Internal,
        }
    }

    /// Get a client-safe error message that doesn't leak sensitive information
    ///
    /// Store and signing errors are sanitized; account ids are redacted.
    pub fn client_message(&self) -> String {
        match self {
            AuthError::Store(_) | AuthError::HashingFailed => "Internal server error".to_string(),
            AuthError::Signing(_) => "Authentication failed".to_string(),
            AuthError::AccountNotFound(_) => "Account not found".to_string(),
            _ => self.to_string(),
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => AuthError::Conflict(msg),
            StoreError::NotFound(id) => AuthError::AccountNotFound(id),
            StoreError::Hashing(detail) => {
                log::error!("Password hashing failed: {}", detail);
                AuthError::HashingFailed
            }
            other => AuthError::Store(other),
        }
    }
}

/// Result type for authentication operations
pub type AuthResult<T> = Result<T, AuthError>;
