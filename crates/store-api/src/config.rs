//! Configuration loaded from environment variables.

use std::env;
use std::net::{IpAddr, SocketAddr};

use database::Database;

/// Store API server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address.
    pub addr: SocketAddr,
    /// SQLite database URL.
    pub database_url: String,
    /// Maximum pooled database connections.
    pub pool_size: u32,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `HOST` | Bind host | `0.0.0.0` |
    /// | `PORT` | Bind port | `3001` |
    /// | `DATABASE_URL` | SQLite database URL | `sqlite:store_info.db?mode=rwc` |
    /// | `DATABASE_POOL_SIZE` | Max pooled connections | `20` |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host: IpAddr = lookup("HOST")
            .unwrap_or_else(|| "0.0.0.0".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidHost)?;

        let port: u16 = match lookup("PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidPort(raw))?,
            None => 3001,
        };

        let database_url =
            lookup("DATABASE_URL").unwrap_or_else(|| "sqlite:store_info.db?mode=rwc".to_string());

        let pool_size = match lookup("DATABASE_POOL_SIZE") {
            Some(raw) => match raw.parse::<u32>() {
                Ok(size) if size > 0 => size,
                _ => return Err(ConfigError::InvalidPoolSize(raw)),
            },
            None => Database::DEFAULT_POOL_SIZE,
        };

        Ok(Self {
            addr: SocketAddr::new(host, port),
            database_url,
            pool_size,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid HOST format")]
    InvalidHost,

    #[error("Invalid PORT: {0}")]
    InvalidPort(String),

    #[error("DATABASE_POOL_SIZE must be a positive integer, got {0}")]
    InvalidPoolSize(String),
}
