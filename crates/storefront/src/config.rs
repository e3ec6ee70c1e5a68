//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CLUBMART_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`); not needed when `CLUBMART_STORE=memory`
//!
//! ## Optional
//! - `CLUBMART_STORE` - `postgres` (default) or `memory`
//! - `CLUBMART_HOST` - Bind address (default: 127.0.0.1)
//! - `CLUBMART_PORT` - Listen port (default: 5000)
//! - `CLUBMART_CORS_ORIGINS` - Comma-separated allowed origins (default: any)
//! - `CLUBMART_ALLOW_ADMIN_SIGNUP` - Let registration request the admin role
//!   (default: false)
//! - `CLUBMART_ORDER_TTL_MINUTES` - Minutes a pending order waits for payment
//!   (default: 30)
//! - `CLUBMART_LOG_JSON` - Emit JSON logs instead of text
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` / `SENTRY_TRACES_SAMPLE_RATE` - 0.0 to 1.0 (default: 1.0)

use std::net::{IpAddr, SocketAddr};

use secrecy::SecretString;
use thiserror::Error;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Which store backs the API.
#[derive(Debug, Clone)]
pub enum StoreConfig {
    /// `PostgreSQL` at the given URL (contains password).
    Postgres { database_url: SecretString },
    /// Process-local store; data is lost on exit.
    Memory,
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct ClubmartConfig {
    /// Backing store
    pub store: StoreConfig,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Allowed CORS origins; empty allows any origin
    pub cors_origins: Vec<String>,
    /// Whether registration may request the admin role
    pub allow_admin_signup: bool,
    /// How long a pending order waits for payment
    pub order_ttl: chrono::Duration,
    /// JSON log output
    pub log_json: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

impl Default for ClubmartConfig {
    /// Local defaults over the in-memory store.
    fn default() -> Self {
        Self {
            store: StoreConfig::Memory,
            host: IpAddr::from([127, 0, 0, 1]),
            port: 5000,
            cors_origins: Vec::new(),
            allow_admin_signup: false,
            order_ttl: chrono::Duration::minutes(DEFAULT_ORDER_TTL_MINUTES),
            log_json: false,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 1.0,
        }
    }
}

const DEFAULT_ORDER_TTL_MINUTES: i64 = 30;

impl ClubmartConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(&|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup(env: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let store = match get_env_or_default(env, "CLUBMART_STORE", "postgres")
            .to_ascii_lowercase()
            .as_str()
        {
            "postgres" => StoreConfig::Postgres {
                database_url: get_database_url(env, "CLUBMART_DATABASE_URL")?,
            },
            "memory" => StoreConfig::Memory,
            other => {
                return Err(ConfigError::InvalidEnvVar(
                    "CLUBMART_STORE".to_string(),
                    format!("expected postgres or memory, got {other}"),
                ));
            }
        };

        let host = get_env_or_default(env, "CLUBMART_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("CLUBMART_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default(env, "CLUBMART_PORT", "5000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("CLUBMART_PORT".to_string(), e.to_string()))?;

        let cors_origins = get_optional_env(env, "CLUBMART_CORS_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let allow_admin_signup = get_bool(env, "CLUBMART_ALLOW_ADMIN_SIGNUP")?;
        let log_json = get_bool(env, "CLUBMART_LOG_JSON")?;

        let ttl_minutes = get_env_or_default(
            env,
            "CLUBMART_ORDER_TTL_MINUTES",
            &DEFAULT_ORDER_TTL_MINUTES.to_string(),
        )
        .parse::<i64>()
        .ok()
        .filter(|m| *m > 0)
        .ok_or_else(|| {
            ConfigError::InvalidEnvVar(
                "CLUBMART_ORDER_TTL_MINUTES".to_string(),
                "must be a positive number of minutes".to_string(),
            )
        })?;

        let sentry_dsn = get_optional_env(env, "SENTRY_DSN");
        let sentry_environment = get_optional_env(env, "SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env(env, "SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env(env, "SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);

        Ok(Self {
            store,
            host,
            port,
            cors_origins,
            allow_admin_signup,
            order_ttl: chrono::Duration::minutes(ttl_minutes),
            log_json,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(
    env: &dyn Fn(&str) -> Option<String>,
    primary_key: &str,
) -> Result<SecretString, ConfigError> {
    env(primary_key)
        .or_else(|| env("DATABASE_URL"))
        .map(SecretString::from)
        .ok_or_else(|| ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional, non-blank environment variable.
fn get_optional_env(env: &dyn Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    env(key).filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(env: &dyn Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    get_optional_env(env, key).unwrap_or_else(|| default.to_string())
}

/// Parse a boolean flag. Unset means false.
fn get_bool(env: &dyn Fn(&str) -> Option<String>, key: &str) -> Result<bool, ConfigError> {
    let Some(value) = get_optional_env(env, key) else {
        return Ok(false);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("expected a boolean, got {other}"),
        )),
    }
}
