//! External identity claims.
//!
//! Provider integrations verify their own tokens and hand the core a flat
//! [`IdentityClaims`]. Only the email is trusted; profile fields are treated
//! as untrusted suggestions.

use super::{
    errors::{AuthError, AuthResult},
    models::{Profile, non_blank},
};
use serde::{Deserialize, Serialize};

/// Identity asserted by an external provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaims {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_url: Option<String>,
}

impl IdentityClaims {
    /// Build claims, trimming values and treating blank strings as absent
    ///
    /// # Errors
    ///
    /// * `AuthError::MissingEmail` - email absent or blank
    pub fn new(
        email: Option<&str>,
        first_name: Option<&str>,
        last_name: Option<&str>,
        avatar_url: Option<&str>,
    ) -> AuthResult<Self> {
        let email = non_blank(email).ok_or(AuthError::MissingEmail)?;
        Ok(Self {
            email,
            first_name: non_blank(first_name),
            last_name: non_blank(last_name),
            avatar_url: non_blank(avatar_url),
        })
    }

    pub fn profile(&self) -> Profile {
        Profile {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            avatar_url: self.avatar_url.clone(),
        }
    }
}

/// Claims of a verified Google ID token
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GoogleIdTokenPayload {
    pub sub: Option<String>,
    pub email: Option<String>,
    pub email_verified: Option<bool>,
    pub name: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub picture: Option<String>,
}

impl GoogleIdTokenPayload {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl TryFrom<GoogleIdTokenPayload> for IdentityClaims {
    type Error = AuthError;

    fn try_from(payload: GoogleIdTokenPayload) -> AuthResult<Self> {
        if payload.email_verified == Some(false) {
            return Err(AuthError::UnverifiedEmail);
        }

        IdentityClaims::new(
            payload.email.as_deref(),
            payload.given_name.as_deref(),
            payload.family_name.as_deref(),
            payload.picture.as_deref(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_fields_become_none() {
        let claims = IdentityClaims::new(Some(" b@x.com "), Some(""), Some("  "), None).unwrap();
        assert_eq!(claims.email, "b@x.com");
        assert_eq!(claims.first_name, None);
        assert_eq!(claims.last_name, None);
        assert_eq!(claims.avatar_url, None);
    }

    #[test]
    fn test_missing_email_rejected() {
        assert!(matches!(
            IdentityClaims::new(None, Some("Jo"), None, None),
            Err(AuthError::MissingEmail)
        ));
        assert!(matches!(
            IdentityClaims::new(Some("   "), None, None, None),
            Err(AuthError::MissingEmail)
        ));
    }

    #[test]
    fn test_google_payload_mapping() {
        let payload = GoogleIdTokenPayload::from_json(
            r#"{
                "sub": "1234567890",
                "email": "b@x.com",
                "email_verified": true,
                "name": "Jo Lee",
                "given_name": "Jo",
                "family_name": "Lee",
                "picture": "http://img",
                "locale": "en"
            }"#,
        )
        .unwrap();

        let claims = IdentityClaims::try_from(payload).unwrap();
        assert_eq!(claims.email, "b@x.com");
        assert_eq!(claims.first_name.as_deref(), Some("Jo"));
        assert_eq!(claims.last_name.as_deref(), Some("Lee"));
        assert_eq!(claims.avatar_url.as_deref(), Some("http://img"));
    }

    #[test]
    fn test_google_payload_without_email() {
        let payload = GoogleIdTokenPayload::from_json(r#"{"sub": "1"}"#).unwrap();
        assert!(matches!(
            IdentityClaims::try_from(payload),
            Err(AuthError::MissingEmail)
        ));
    }

    #[test]
    fn test_google_payload_unverified_email() {
        let payload =
            GoogleIdTokenPayload::from_json(r#"{"email": "b@x.com", "email_verified": false}"#)
                .unwrap();
        assert!(matches!(
            IdentityClaims::try_from(payload),
            Err(AuthError::UnverifiedEmail)
        ));
    }
}
