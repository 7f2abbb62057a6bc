//! Authentication data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Account ID type (UUIDv7, time-sortable)
pub type AccountId = Uuid;

/// Account model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_url: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub email_confirmed: bool,
    pub oauth_email_confirmed: bool,
    #[serde(skip_serializing)]
    pub refresh_token_hash: Option<String>,
    pub refresh_token_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Build a fresh account with a newly assigned id
    pub fn new(email: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            email: email.into(),
            first_name: None,
            last_name: None,
            avatar_url: None,
            password_hash: None,
            email_confirmed: false,
            oauth_email_confirmed: false,
            refresh_token_hash: None,
            refresh_token_expires_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Lower-cased, trimmed email used for uniqueness and lookup
    pub fn normalized_email(&self) -> String {
        normalize_email(&self.email)
    }

    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }

    /// Copy profile fields from `profile` into every slot that is currently empty.
    ///
    /// Non-empty local values are never replaced. Returns true if anything changed.
    pub fn fill_missing_profile(&mut self, profile: &Profile) -> bool {
        let mut changed = false;
        changed |= fill_if_empty(&mut self.first_name, &profile.first_name);
        changed |= fill_if_empty(&mut self.last_name, &profile.last_name);
        changed |= fill_if_empty(&mut self.avatar_url, &profile.avatar_url);
        changed
    }

    pub fn profile(&self) -> Profile {
        Profile {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            avatar_url: self.avatar_url.clone(),
        }
    }
}

fn fill_if_empty(slot: &mut Option<String>, incoming: &Option<String>) -> bool {
    if !is_blank(slot.as_deref()) {
        return false;
    }
    match non_blank(incoming.as_deref()) {
        Some(value) => {
            *slot = Some(value);
            true
        }
        None => false,
    }
}

/// Lower-case and trim an email for comparison
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub(crate) fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}

/// Trimmed copy of `value`, or `None` when absent or whitespace only
pub(crate) fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Optional profile fields shared by registration and external identities
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// Password registration request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

/// Password login request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// JWT claims for access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    pub sub: String,  // Account ID
    pub jti: String,  // Unique per token
    pub sid: String,  // Session identifier
    pub email: String,
    #[serde(default)]
    pub given_name: String,
    #[serde(default)]
    pub family_name: String,
    pub iss: String,
    pub aud: String,
    pub exp: i64,     // Expiration timestamp
    pub iat: i64,     // Issued at timestamp
}

impl AccessTokenClaims {
    /// Parse the subject back into an account id
    pub fn account_id(&self) -> Option<AccountId> {
        Uuid::parse_str(&self.sub).ok()
    }
}

/// Result of a successful login, OAuth login or refresh.
///
/// The plaintext refresh token lives only here and in transit to the client.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    pub account_id: AccountId,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_url: Option<String>,
    pub email_confirmed: bool,
    pub oauth_email_confirmed: bool,
    pub access_token: String,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token: String,
    pub refresh_token_expires_at: DateTime<Utc>,
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSession")
            .field("account_id", &self.account_id)
            .field("email", &self.email)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("avatar_url", &self.avatar_url)
            .field("email_confirmed", &self.email_confirmed)
            .field("oauth_email_confirmed", &self.oauth_email_confirmed)
            .field("access_token", &"<redacted>")
            .field("access_token_expires_at", &self.access_token_expires_at)
            .field("refresh_token", &"<redacted>")
            .field("refresh_token_expires_at", &self.refresh_token_expires_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(first: Option<&str>, last: Option<&str>, avatar: Option<&str>) -> Profile {
        Profile {
            first_name: first.map(str::to_string),
            last_name: last.map(str::to_string),
            avatar_url: avatar.map(str::to_string),
        }
    }

    #[test]
    fn test_fill_missing_profile_only_fills_empty_slots() {
        let mut account = Account::new("a@x.com");
        account.first_name = Some("Jo".to_string());
        account.last_name = Some("   ".to_string());

        let changed = account.fill_missing_profile(&profile(Some("Other"), Some("Lee"), None));

        assert!(changed);
        assert_eq!(account.first_name.as_deref(), Some("Jo"));
        assert_eq!(account.last_name.as_deref(), Some("Lee"));
        assert_eq!(account.avatar_url, None);
    }

    #[test]
    fn test_fill_missing_profile_ignores_blank_incoming() {
        let mut account = Account::new("a@x.com");
        let changed = account.fill_missing_profile(&profile(Some(""), Some(" "), None));
        assert!(!changed);
        assert_eq!(account.first_name, None);
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn test_auth_session_debug_redacts_tokens() {
        let session = AuthSession {
            account_id: Uuid::now_v7(),
            email: "a@x.com".to_string(),
            first_name: None,
            last_name: None,
            avatar_url: None,
            email_confirmed: false,
            oauth_email_confirmed: true,
            access_token: "access-secret-value".to_string(),
            access_token_expires_at: Utc::now(),
            refresh_token: "refresh-secret-value".to_string(),
            refresh_token_expires_at: Utc::now(),
        };
        let rendered = format!("{session:?}");
        assert!(!rendered.contains("access-secret-value"));
        assert!(!rendered.contains("refresh-secret-value"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_account_serialization_skips_secrets() {
        let mut account = Account::new("a@x.com");
        account.password_hash = Some("$argon2id$stuff".to_string());
        account.refresh_token_hash = Some("deadbeef".to_string());
        let json = serde_json::to_string(&account).unwrap();
        assert!(!json.contains("argon2id"));
        assert!(!json.contains("deadbeef"));
    }
}
