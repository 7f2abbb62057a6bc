//! Structured logging configuration.
//!
//! Library code logs through the `log` facade; the subscriber installed here
//! also captures those records.

use account_auth::auth::AccountId;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured logging
///
/// Logs go to stderr so that command output on stdout stays valid JSON.
/// Levels are configurable via the `RUST_LOG` env var.
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::debug!("Structured logging initialized");
}

/// Log security event with structured data
///
/// # Arguments
///
/// * `event_type` - Type of security event
/// * `account_id` - Optional account ID
/// * `message` - Event message
///
/// # Example
///
/// ```ignore
/// log_security_event("failed_login", None, "Invalid credentials");
/// ```
pub fn log_security_event(event_type: &str, account_id: Option<AccountId>, message: &str) {
    let account_id = account_id.map(|id| id.to_string());
    tracing::warn!(
        event_type = event_type,
        account_id = account_id.as_deref(),
        "SECURITY: {}",
        message
    );
}

/// Log how long a command took
pub fn log_performance(operation: &str, duration_ms: u64) {
    if duration_ms > 1000 {
        tracing::warn!(
            operation = operation,
            duration_ms = duration_ms,
            "PERFORMANCE: Slow operation"
        );
    } else {
        tracing::debug!(
            operation = operation,
            duration_ms = duration_ms,
            "Performance metric"
        );
    }
}
