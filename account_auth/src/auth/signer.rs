//! Access-token signing and refresh-secret generation.

use super::{
    config::AuthConfig,
    errors::{AuthError, AuthResult},
    models::{AccessTokenClaims, Account},
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::fmt;
use subtle::ConstantTimeEq;
use uuid::Uuid;

/// Refresh secret length in bytes (512 bits)
pub const REFRESH_SECRET_BYTES: usize = 64;

const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

/// Signed access token and its expiry
#[derive(Clone)]
pub struct IssuedAccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Plaintext refresh secret, handed to the caller exactly once
#[derive(Clone)]
pub struct RefreshSecret {
    pub secret: String,
    pub expires_at: DateTime<Utc>,
}

impl fmt::Debug for IssuedAccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedAccessToken")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl fmt::Debug for RefreshSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshSecret")
            .field("secret", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Mints and validates access tokens, generates and hashes refresh secrets
#[derive(Clone)]
pub struct TokenSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
    access_token_ttl: Duration,
    refresh_token_ttl: Duration,
}

impl TokenSigner {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            access_token_ttl: config.access_token_ttl,
            refresh_token_ttl: config.refresh_token_ttl,
        }
    }

    /// Mint a signed access token for an account
    ///
    /// Every token carries a fresh `jti`, so two tokens minted for the same
    /// account within the same second still differ.
    ///
    /// # Errors
    ///
    /// * `AuthError::Signing` - the JWT library failed to sign
    pub fn mint_access_token(&self, account: &Account) -> AuthResult<IssuedAccessToken> {
        let now = Utc::now();
        let expires_at = expiry_after(now, self.access_token_ttl);
        let claims = AccessTokenClaims {
            sub: account.id.to_string(),
            jti: Uuid::new_v4().to_string(),
            sid: Uuid::now_v7().to_string(),
            email: account.email.clone(),
            given_name: account.first_name.clone().unwrap_or_default(),
            family_name: account.last_name.clone().unwrap_or_default(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
        };

        let token = encode(&Header::new(SIGNING_ALGORITHM), &claims, &self.encoding_key)
            .map_err(AuthError::Signing)?;

        Ok(IssuedAccessToken { token, expires_at })
    }

    /// Generate a random refresh secret and its expiry
    pub fn generate_refresh_secret(&self) -> RefreshSecret {
        let mut bytes = [0u8; REFRESH_SECRET_BYTES];
        rand::rng().fill_bytes(&mut bytes);

        RefreshSecret {
            secret: URL_SAFE_NO_PAD.encode(bytes),
            expires_at: expiry_after(Utc::now(), self.refresh_token_ttl),
        }
    }

    /// One-way digest of a refresh secret (hex SHA-256)
    pub fn hash(secret: &str) -> String {
        hex::encode(Sha256::digest(secret.as_bytes()))
    }

    /// Validate an access token, including its expiry
    ///
    /// # Errors
    ///
    /// * `AuthError::InvalidToken` - bad signature, algorithm, issuer, audience or expired
    pub fn validate_access_token(&self, token: &str) -> AuthResult<AccessTokenClaims> {
        self.decode_claims(token, true)
    }

    /// Extract claims from a token whose lifetime may have elapsed.
    ///
    /// Signature, algorithm, issuer and audience are still enforced; only the
    /// expiry check is skipped. Used by refresh rotation and nothing else.
    ///
    /// # Errors
    ///
    /// * `AuthError::InvalidToken` - bad signature, algorithm, issuer or audience
    pub fn claims_from_expired_token(&self, token: &str) -> AuthResult<AccessTokenClaims> {
        self.decode_claims(token, false)
    }

    fn decode_claims(&self, token: &str, validate_exp: bool) -> AuthResult<AccessTokenClaims> {
        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_audience(&[self.audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.leeway = 0;
        validation.validate_exp = validate_exp;

        decode::<AccessTokenClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                log::debug!("Access token rejected: {}", e);
                AuthError::InvalidToken
            })
    }
}

/// Compare two digests in constant time
pub fn digests_match(stored: &str, presented: &str) -> bool {
    stored.as_bytes().ct_eq(presented.as_bytes()).into()
}

/// `now + ttl`, saturating at the latest representable instant
fn expiry_after(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC)
}
