//! CLI configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use account_auth::{
    auth::{AuthConfig, ConfigError},
    db::DatabaseConfig,
};

/// Complete CLI configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Token signing and password hashing configuration
    pub auth: AuthConfig,
    /// Database configuration, absent when no database URL is known
    pub database: Option<DatabaseConfig>,
}

impl CliConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `database_url_override` - Optional database URL override (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if `JWT_SECRET` is missing or any value is invalid
    pub fn from_env(database_url_override: Option<String>) -> Result<Self, ConfigError> {
        let auth = AuthConfig::from_env()?;

        let database = match (database_url_override, DatabaseConfig::from_env()) {
            (Some(url), Ok(config)) => Some(DatabaseConfig {
                database_url: url,
                ..config
            }),
            (Some(url), Err(ConfigError::MissingRequired { .. })) => Some(DatabaseConfig {
                database_url: url,
                ..DatabaseConfig::development()
            }),
            (None, Err(ConfigError::MissingRequired { .. })) => None,
            (_, result) => Some(result?),
        };

        Ok(CliConfig { auth, database })
    }

    /// Database configuration, or an error naming the missing variable
    pub fn require_database(&self) -> Result<&DatabaseConfig, ConfigError> {
        self.database
            .as_ref()
            .ok_or_else(|| ConfigError::MissingRequired {
                var: "DATABASE_URL".to_string(),
                hint: "Set DATABASE_URL or pass --db-url".to_string(),
            })
    }
}
