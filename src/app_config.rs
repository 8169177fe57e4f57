// Centralized configuration management for the booking engine
// Load ALL env vars ONCE at startup

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Global application configuration loaded once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(|| {
    // For tests, load .env file first
    #[cfg(test)]
    dotenv::dotenv().ok();

    AppConfig::from_env().expect("Failed to load configuration")
});

/// Accessor used by code that should not capture the Lazy directly
pub fn config() -> &'static AppConfig {
    &CONFIG
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    // Server
    pub bind_address: String,
    pub port: u16,
    pub environment: Environment,

    // Database
    pub database_url: String,
    pub database_max_connections: u32,
    pub database_min_connections: u32,
    pub database_connect_timeout: u64,
    pub database_idle_timeout: u64,
    pub database_max_lifetime: u64,

    // Security
    pub cors_allowed_origins: Vec<String>,

    // Features
    pub disable_embedded_migrations: bool,

    // Nested configs
    pub booking: BookingConfig,
    pub integrations: IntegrationsConfig,
}

/// Environment type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Environment {
    Development,
    Test,
    Staging,
    Production,
}

impl From<String> for Environment {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Environment::Development,
            "test" => Environment::Test,
            "staging" | "stage" => Environment::Staging,
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Staging => write!(f, "staging"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Booking engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingConfig {
    /// Interval for the expired-hold sweeper; None disables it
    pub hold_sweep_interval_secs: Option<u64>,
}

/// External calendar provider credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrationsConfig {
    pub google_client_id: String,
    pub google_client_secret: String,
    pub outlook_client_id: String,
    pub outlook_client_secret: String,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            bind_address: env_or("BIND_ADDRESS", "0.0.0.0"),
            port: parse_env("PORT", 8080)?,
            environment: Environment::from(env_or("ENVIRONMENT", "development")),

            database_url: env_or(
                "DATABASE_URL",
                "postgresql://localhost:5432/slotly_dev",
            ),
            database_max_connections: parse_env("DATABASE_MAX_CONNECTIONS", 20)?,
            database_min_connections: parse_env("DATABASE_MIN_CONNECTIONS", 2)?,
            database_connect_timeout: parse_env("DATABASE_CONNECT_TIMEOUT", 10)?,
            database_idle_timeout: parse_env("DATABASE_IDLE_TIMEOUT", 300)?,
            database_max_lifetime: parse_env("DATABASE_MAX_LIFETIME", 1800)?,

            cors_allowed_origins: env_or("CORS_ALLOWED_ORIGINS", "*")
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),

            disable_embedded_migrations: parse_env("DISABLE_EMBEDDED_MIGRATIONS", false)?,

            booking: BookingConfig {
                hold_sweep_interval_secs: optional_parse_env("BOOKING_HOLD_SWEEP_INTERVAL_SECS")?,
            },

            integrations: IntegrationsConfig {
                google_client_id: env_or("GOOGLE_CALENDAR_CLIENT_ID", ""),
                google_client_secret: env_or("GOOGLE_CALENDAR_CLIENT_SECRET", ""),
                outlook_client_id: env_or("OUTLOOK_CALENDAR_CLIENT_ID", ""),
                outlook_client_secret: env_or("OUTLOOK_CALENDAR_CLIENT_SECRET", ""),
            },
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue(key.to_string(), raw)),
        Err(_) => Ok(default),
    }
}

fn optional_parse_env<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(key.to_string(), raw)),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_parsing() {
        assert_eq!(Environment::from("prod".to_string()), Environment::Production);
        assert_eq!(Environment::from("TEST".to_string()), Environment::Test);
        assert_eq!(
            Environment::from("anything-else".to_string()),
            Environment::Development
        );
    }

    #[test]
    fn test_defaults_apply_without_env() {
        // Unset keys fall back to defaults rather than failing startup
        let parsed: u32 = parse_env("SLOTLY_TEST_UNSET_KEY", 42).unwrap();
        assert_eq!(parsed, 42);

        let optional: Option<u64> = optional_parse_env("SLOTLY_TEST_UNSET_KEY").unwrap();
        assert_eq!(optional, None);
    }
}
