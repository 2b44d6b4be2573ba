//! Process configuration.
//!
//! Everything is read once at startup into an immutable [`AppConfig`].
//! Values come from the process environment, optionally seeded from `.env`
//! files (see [`load_env_files`]). Readers take a lookup closure instead of
//! touching `std::env` directly, so tests can feed them a plain map.

mod env_files;

use crate::db::DatabaseConfig;
use crate::jwt::JwtConfig;
use crate::protection::ProtectionConfig;

pub use env_files::{load_env_files, EnvFiles};

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("failed to read env file {path}: {reason}")]
    EnvFile { path: String, reason: String },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Deployment environment, from `NODE_ENV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl Environment {
    /// Anything other than `development` or `test`, including an unset
    /// variable, is production.
    pub fn from_node_env(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("development") => Environment::Development,
            Some("test") => Environment::Test,
            _ => Environment::Production,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Test => "test",
            Environment::Production => "production",
        }
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub protection: ProtectionConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = Environment::from_node_env(lookup("NODE_ENV").as_deref());

        let host = lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match lookup("PORT") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                name: "PORT",
                reason: format!("'{raw}' is not a valid port"),
            })?,
            None => DEFAULT_PORT,
        };
        let log_level = lookup("LOG_LEVEL").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());

        let database = DatabaseConfig::from_lookup(&lookup, environment)?;
        let jwt = JwtConfig::from_lookup(&lookup);
        let protection = ProtectionConfig::from_lookup(&lookup, environment);

        Ok(Self {
            environment,
            host,
            port,
            log_level,
            database,
            jwt,
            protection,
        })
    }
}
