//! Password hashing and verification.

use super::models::Account;
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use std::sync::OnceLock;

/// Argon2id hash checked when an email has no account, so that path costs
/// the same as a wrong password
static DECOY_HASH: OnceLock<Option<String>> = OnceLock::new();

fn decoy_hash() -> Option<&'static str> {
    DECOY_HASH
        .get_or_init(|| {
            CredentialVerifier::new("")
                .hash_password("decoy-password-never-matches")
                .ok()
        })
        .as_deref()
}

/// Argon2id password hashing with a server-side pepper
#[derive(Clone)]
pub struct CredentialVerifier {
    pepper: String,
}

impl CredentialVerifier {
    pub fn new(pepper: impl Into<String>) -> Self {
        Self {
            pepper: pepper.into(),
        }
    }

    /// Hash a password with Argon2id + pepper into a PHC string
    pub fn hash_password(&self, password: &str) -> Result<String, argon2::password_hash::Error> {
        let salt = SaltString::generate(&mut OsRng);
        Ok(Argon2::default()
            .hash_password(self.peppered(password).as_bytes(), &salt)?
            .to_string())
    }

    /// Check a plaintext password against the account's stored hash.
    ///
    /// Fails closed: an account without a hash, or with an unparsable one,
    /// never verifies.
    pub fn verify(&self, account: &Account, password: &str) -> bool {
        let Some(stored) = account.password_hash.as_deref() else {
            return false;
        };

        let Ok(parsed_hash) = PasswordHash::new(stored) else {
            log::warn!("Account {} has an unparsable password hash", account.id);
            return false;
        };

        Argon2::default()
            .verify_password(self.peppered(password).as_bytes(), &parsed_hash)
            .is_ok()
    }

    /// Run a full Argon2 verification for an email that has no account.
    ///
    /// Always false.
    pub fn verify_decoy(&self, password: &str) -> bool {
        let Some(parsed_hash) = decoy_hash().and_then(|hash| PasswordHash::new(hash).ok()) else {
            return false;
        };

        let _ = Argon2::default().verify_password(self.peppered(password).as_bytes(), &parsed_hash);
        false
    }

    fn peppered(&self, password: &str) -> String {
        format!("{}{}", password, self.pepper)
    }
}
