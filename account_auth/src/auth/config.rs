//! Token and credential configuration.

use chrono::Duration;
use std::env;

/// Minimum signing secret length (128-bit security with hex secrets)
pub const MIN_SECRET_LEN: usize = 32;

/// Minimum pepper length when one is configured
pub const MIN_PEPPER_LEN: usize = 16;

pub const DEFAULT_ISSUER: &str = "account-auth";
pub const DEFAULT_AUDIENCE: &str = "account-auth-clients";
pub const DEFAULT_ACCESS_TOKEN_MINUTES: i64 = 15;
pub const DEFAULT_REFRESH_TOKEN_DAYS: i64 = 15;
pub const MAX_ACCESS_TOKEN_MINUTES: i64 = 24 * 60;
pub const MAX_REFRESH_TOKEN_DAYS: i64 = 365;

/// Authentication configuration
#[derive(Clone)]
pub struct AuthConfig {
    /// HS256 signing secret
    pub jwt_secret: String,
    /// Expected `iss` claim
    pub issuer: String,
    /// Expected `aud` claim
    pub audience: String,
    /// Access token lifetime
    pub access_token_ttl: Duration,
    /// Refresh token lifetime
    pub refresh_token_ttl: Duration,
    /// Server-side pepper mixed into password hashes
    pub password_pepper: String,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .field("password_pepper", &"<redacted>")
            .finish()
    }
}

impl AuthConfig {
    /// Configuration with default issuer, audience and lifetimes
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            issuer: DEFAULT_ISSUER.to_string(),
            audience: DEFAULT_AUDIENCE.to_string(),
            access_token_ttl: Duration::minutes(DEFAULT_ACCESS_TOKEN_MINUTES),
            refresh_token_ttl: Duration::days(DEFAULT_REFRESH_TOKEN_DAYS),
            password_pepper: String::new(),
        }
    }

    /// Load configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `JWT_SECRET`: signing secret (required, at least 32 characters)
    /// - `JWT_ISSUER`: issuer (default: `account-auth`)
    /// - `JWT_AUDIENCE`: audience (default: `account-auth-clients`)
    /// - `JWT_ACCESS_TOKEN_MINUTES`: access token lifetime (default: 15, at most a day)
    /// - `JWT_REFRESH_TOKEN_DAYS`: refresh token lifetime (default: 15, at most 365)
    /// - `PASSWORD_PEPPER`: optional pepper, at least 16 characters when set
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a required variable is missing or a value is invalid
    pub fn from_env() -> Result<Self, ConfigError> {
        let jwt_secret = env::var("JWT_SECRET").map_err(|_| ConfigError::MissingRequired {
            var: "JWT_SECRET".to_string(),
            hint: "Generate with: openssl rand -hex 32".to_string(),
        })?;

        let config = Self {
            jwt_secret,
            issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| DEFAULT_ISSUER.to_string()),
            audience: env::var("JWT_AUDIENCE").unwrap_or_else(|_| DEFAULT_AUDIENCE.to_string()),
            access_token_ttl: parse_ttl(
                "JWT_ACCESS_TOKEN_MINUTES",
                DEFAULT_ACCESS_TOKEN_MINUTES,
                Duration::try_minutes,
            )?,
            refresh_token_ttl: parse_ttl(
                "JWT_REFRESH_TOKEN_DAYS",
                DEFAULT_REFRESH_TOKEN_DAYS,
                Duration::try_days,
            )?,
            password_pepper: env::var("PASSWORD_PEPPER").unwrap_or_default(),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::Invalid {
                var: "JWT_SECRET".to_string(),
                reason: format!("Must be at least {MIN_SECRET_LEN} characters"),
            });
        }

        if !self.password_pepper.is_empty() && self.password_pepper.len() < MIN_PEPPER_LEN {
            return Err(ConfigError::Invalid {
                var: "PASSWORD_PEPPER".to_string(),
                reason: format!("Must be at least {MIN_PEPPER_LEN} characters when set"),
            });
        }

        if self.issuer.trim().is_empty() {
            return Err(ConfigError::Invalid {
                var: "JWT_ISSUER".to_string(),
                reason: "Must not be empty".to_string(),
            });
        }

        if self.audience.trim().is_empty() {
            return Err(ConfigError::Invalid {
                var: "JWT_AUDIENCE".to_string(),
                reason: "Must not be empty".to_string(),
            });
        }

        if self.access_token_ttl <= Duration::zero()
            || self.access_token_ttl > Duration::minutes(MAX_ACCESS_TOKEN_MINUTES)
        {
            return Err(ConfigError::Invalid {
                var: "JWT_ACCESS_TOKEN_MINUTES".to_string(),
                reason: format!("Must be between 1 and {MAX_ACCESS_TOKEN_MINUTES}"),
            });
        }

        if self.refresh_token_ttl <= Duration::zero()
            || self.refresh_token_ttl > Duration::days(MAX_REFRESH_TOKEN_DAYS)
        {
            return Err(ConfigError::Invalid {
                var: "JWT_REFRESH_TOKEN_DAYS".to_string(),
                reason: format!("Must be between 1 and {MAX_REFRESH_TOKEN_DAYS}"),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Parse an environment variable, falling back to `default` when unset.
///
/// A set-but-unparsable value is an error rather than a silent default.
pub fn parse_env<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            var: key.to_string(),
            reason: format!("Could not parse '{raw}'"),
        }),
        Err(_) => Ok(default),
    }
}

/// Parse a lifetime from a count of units, rejecting counts too large to represent
fn parse_ttl(
    key: &str,
    default: i64,
    to_duration: fn(i64) -> Option<Duration>,
) -> Result<Duration, ConfigError> {
    let count = parse_env(key, default)?;
    to_duration(count).ok_or_else(|| ConfigError::Invalid {
        var: key.to_string(),
        reason: format!("{count} is out of range"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn clear_env() {
        // SAFETY: tests touching the environment run serially.
        unsafe {
            for key in [
                "JWT_SECRET",
                "JWT_ISSUER",
                "JWT_AUDIENCE",
                "JWT_ACCESS_TOKEN_MINUTES",
                "JWT_REFRESH_TOKEN_DAYS",
                "PASSWORD_PEPPER",
            ] {
                env::remove_var(key);
            }
        }
    }

    #[test]
    #[serial]
    fn test_from_env_requires_secret() {
        clear_env();
        let err = AuthConfig::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired { ref var, .. } if var == "JWT_SECRET"));
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        clear_env();
        unsafe {
            env::set_var("JWT_SECRET", SECRET);
        }
        let config = AuthConfig::from_env().unwrap();
        assert_eq!(config.issuer, DEFAULT_ISSUER);
        assert_eq!(config.audience, DEFAULT_AUDIENCE);
        assert_eq!(config.access_token_ttl, Duration::minutes(15));
        assert_eq!(config.refresh_token_ttl, Duration::days(15));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_garbage_ttl() {
        clear_env();
        unsafe {
            env::set_var("JWT_SECRET", SECRET);
            env::set_var("JWT_ACCESS_TOKEN_MINUTES", "soon");
        }
        let err = AuthConfig::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref var, .. } if var == "JWT_ACCESS_TOKEN_MINUTES"));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_unrepresentable_ttl() {
        clear_env();
        unsafe {
            env::set_var("JWT_SECRET", SECRET);
            env::set_var("JWT_ACCESS_TOKEN_MINUTES", i64::MAX.to_string());
        }
        let err = AuthConfig::from_env().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid { ref var, .. } if var == "JWT_ACCESS_TOKEN_MINUTES"
        ));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_oversized_ttl() {
        clear_env();
        unsafe {
            env::set_var("JWT_SECRET", SECRET);
            env::set_var("JWT_REFRESH_TOKEN_DAYS", "100000000");
        }
        let err = AuthConfig::from_env().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid { ref var, .. } if var == "JWT_REFRESH_TOKEN_DAYS"
        ));

        unsafe {
            env::set_var("JWT_REFRESH_TOKEN_DAYS", MAX_REFRESH_TOKEN_DAYS.to_string());
            env::set_var("JWT_ACCESS_TOKEN_MINUTES", MAX_ACCESS_TOKEN_MINUTES.to_string());
        }
        let config = AuthConfig::from_env().unwrap();
        assert_eq!(config.refresh_token_ttl, Duration::days(MAX_REFRESH_TOKEN_DAYS));
        clear_env();
    }

    #[test]
    fn test_validate_caps_lifetimes() {
        let mut config = AuthConfig::new(SECRET);
        config.access_token_ttl = Duration::minutes(MAX_ACCESS_TOKEN_MINUTES + 1);
        assert!(config.validate().is_err());

        let mut config = AuthConfig::new(SECRET);
        config.refresh_token_ttl = Duration::days(MAX_REFRESH_TOKEN_DAYS + 1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_short_secret() {
        let config = AuthConfig::new("short");
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_validate_short_pepper() {
        let mut config = AuthConfig::new(SECRET);
        config.password_pepper = "tiny".to_string();
        assert!(config.validate().is_err());

        config.password_pepper = "a".repeat(MIN_PEPPER_LEN);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut config = AuthConfig::new(SECRET);
        config.password_pepper = "pepperpepperpepper".to_string();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains(SECRET));
        assert!(!rendered.contains("pepperpepperpepper"));
    }
}
