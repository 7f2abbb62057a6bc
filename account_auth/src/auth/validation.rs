//! Request validation run before any store access.

use super::{
    errors::{AuthError, AuthResult},
    models::{LoginRequest, RegisterRequest},
};

/// Minimum password length for registration
pub const MIN_PASSWORD_LEN: usize = 8;

/// Maximum accepted email length (RFC 5321 path limit)
pub const MAX_EMAIL_LEN: usize = 254;

/// Login only rejects empty input; password policy is never echoed back on login.
pub fn validate_login(request: &LoginRequest) -> AuthResult<()> {
    require_non_empty("email", &request.email)?;
    if request.password.is_empty() {
        return Err(AuthError::validation("password", "Password is required"));
    }
    Ok(())
}

pub fn validate_registration(request: &RegisterRequest) -> AuthResult<()> {
    require_non_empty("first_name", &request.first_name)?;
    require_non_empty("last_name", &request.last_name)?;
    validate_email(&request.email)?;
    validate_password_strength(&request.password)
}

/// Validate email shape: `local@domain.tld`, no whitespace
pub fn validate_email(email: &str) -> AuthResult<()> {
    let email = email.trim();
    require_non_empty("email", email)?;

    if email.len() > MAX_EMAIL_LEN {
        return Err(AuthError::validation(
            "email",
            format!("Email must be at most {MAX_EMAIL_LEN} characters"),
        ));
    }

    let well_formed = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };

    if !well_formed {
        return Err(AuthError::validation("email", "Email address is not valid"));
    }
    Ok(())
}

/// Validate password strength
pub fn validate_password_strength(password: &str) -> AuthResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::validation(
            "password",
            format!("Password must be at least {MIN_PASSWORD_LEN} characters"),
        ));
    }

    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_uppercase = password.chars().any(char::is_uppercase);
    let has_lowercase = password.chars().any(char::is_lowercase);
    let has_symbol = password.chars().any(|c| !c.is_alphanumeric());

    if !has_digit || !has_uppercase || !has_lowercase || !has_symbol {
        return Err(AuthError::validation(
            "password",
            "Password must contain an uppercase letter, a lowercase letter, a digit and a symbol",
        ));
    }

    Ok(())
}

fn require_non_empty(field: &'static str, value: &str) -> AuthResult<()> {
    if value.trim().is_empty() {
        return Err(AuthError::validation(field, format!("{field} is required")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            password: password.to_string(),
            first_name: "Jo".to_string(),
            last_name: "Lee".to_string(),
        }
    }

    fn field_of(err: AuthError) -> &'static str {
        match err {
            AuthError::Validation { field, .. } => field,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_login_rejects_empty_fields() {
        let err = validate_login(&LoginRequest {
            email: "  ".to_string(),
            password: "x".to_string(),
        })
        .unwrap_err();
        assert_eq!(field_of(err), "email");

        let err = validate_login(&LoginRequest {
            email: "a@x.com".to_string(),
            password: String::new(),
        })
        .unwrap_err();
        assert_eq!(field_of(err), "password");
    }

    #[test]
    fn test_login_does_not_enforce_policy() {
        assert!(
            validate_login(&LoginRequest {
                email: "a@x.com".to_string(),
                password: "short".to_string(),
            })
            .is_ok()
        );
    }

    #[test]
    fn test_email_shapes() {
        assert!(validate_email("a@x.com").is_ok());
        assert!(validate_email(" a@x.com ").is_ok());
        assert!(validate_email("a@x").is_err());
        assert!(validate_email("@x.com").is_err());
        assert!(validate_email("a@@x.com").is_err());
        assert!(validate_email("a b@x.com").is_err());
        assert!(validate_email("a@.com").is_err());
        assert!(validate_email("").is_err());
    }

    #[test]
    fn test_password_strength() {
        assert!(validate_password_strength("Str0ng#Pass").is_ok());
        assert!(validate_password_strength("Sh0rt#").is_err());
        assert!(validate_password_strength("nouppercase1#").is_err());
        assert!(validate_password_strength("NOLOWERCASE1#").is_err());
        assert!(validate_password_strength("NoDigits#Here").is_err());
        assert!(validate_password_strength("NoSymbol1Here").is_err());
    }

    #[test]
    fn test_registration_requires_names() {
        let mut request = register("a@x.com", "Str0ng#Pass");
        request.first_name = String::new();
        assert_eq!(field_of(validate_registration(&request).unwrap_err()), "first_name");

        let mut request = register("a@x.com", "Str0ng#Pass");
        request.last_name = " ".to_string();
        assert_eq!(field_of(validate_registration(&request).unwrap_err()), "last_name");

        assert!(validate_registration(&register("a@x.com", "Str0ng#Pass")).is_ok());
    }
}
