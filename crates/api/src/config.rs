//! Application configuration loaded from environment variables.

use std::time::Duration;

use saga::{CircuitBreakerConfig, RetryConfig};

/// Log output format selected by `LOG_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` bind address (default: `"0.0.0.0"`)
/// - `PORT` listen port (default: `3000`)
/// - `RUST_LOG` tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT` `json` for JSON lines, anything else for human output
/// - `DATABASE_URL` PostgreSQL reservation store; in-memory when unset
/// - `INVENTORY_URL` base URL of a remote inventory authority; the
///   in-process engine is used when unset
/// - `RETRY_MAX_ATTEMPTS`, `RETRY_BASE_BACKOFF_MS`, `RETRY_MAX_BACKOFF_MS`,
///   `CALL_TIMEOUT_MS` retry policy for inventory calls
/// - `BREAKER_FAILURE_THRESHOLD`, `BREAKER_WINDOW_SECS`,
///   `BREAKER_COOLDOWN_SECS` circuit breaker around inventory calls
/// - `LEDGER_TTL_SECS` how long processed attempt tokens are remembered
/// - `SEED_DEMO_DATA` seed a few demo rooms on startup (default: `true`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub inventory_url: Option<String>,
    pub retry_max_attempts: u32,
    pub retry_base_backoff: Duration,
    pub retry_max_backoff: Duration,
    pub call_timeout: Duration,
    pub breaker_failure_threshold: u32,
    pub breaker_window: Duration,
    pub breaker_cooldown: Duration,
    pub ledger_ttl: Duration,
    pub seed_demo_data: bool,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup. Unparseable
    /// values fall back to the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let parsed = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            host: non_empty("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: non_empty("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: match lookup("LOG_FORMAT") {
                Some(f) if f.eq_ignore_ascii_case("json") => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
            database_url: non_empty("DATABASE_URL"),
            inventory_url: non_empty("INVENTORY_URL")
                .map(|url| url.trim_end_matches('/').to_string()),
            retry_max_attempts: parsed("RETRY_MAX_ATTEMPTS")
                .and_then(|n| u32::try_from(n).ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.retry_max_attempts),
            retry_base_backoff: parsed("RETRY_BASE_BACKOFF_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_base_backoff),
            retry_max_backoff: parsed("RETRY_MAX_BACKOFF_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_max_backoff),
            call_timeout: parsed("CALL_TIMEOUT_MS")
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.call_timeout),
            breaker_failure_threshold: parsed("BREAKER_FAILURE_THRESHOLD")
                .and_then(|n| u32::try_from(n).ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.breaker_failure_threshold),
            breaker_window: parsed("BREAKER_WINDOW_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.breaker_window),
            breaker_cooldown: parsed("BREAKER_COOLDOWN_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.breaker_cooldown),
            ledger_ttl: parsed("LEDGER_TTL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.ledger_ttl),
            seed_demo_data: lookup("SEED_DEMO_DATA")
                .map(|v| !matches!(v.trim().to_ascii_lowercase().as_str(), "0" | "false" | "no"))
                .unwrap_or(defaults.seed_demo_data),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.retry_max_attempts,
            base_backoff: self.retry_base_backoff,
            max_backoff: self.retry_max_backoff,
            call_timeout: self.call_timeout,
            ..RetryConfig::default()
        }
    }

    pub fn breaker_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.breaker_failure_threshold,
            failure_window: self.breaker_window,
            cooldown: self.breaker_cooldown,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let retry = RetryConfig::default();
        let breaker = CircuitBreakerConfig::default();
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            database_url: None,
            inventory_url: None,
            retry_max_attempts: retry.max_attempts,
            retry_base_backoff: retry.base_backoff,
            retry_max_backoff: retry.max_backoff,
            call_timeout: retry.call_timeout,
            breaker_failure_threshold: breaker.failure_threshold,
            breaker_window: breaker.failure_window,
            breaker_cooldown: breaker.cooldown,
            ledger_ttl: inventory::DEFAULT_LEDGER_TTL,
            seed_demo_data: true,
        }
    }
}
