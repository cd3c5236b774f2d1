//! Configuration management for the content store
//!
//! Loads the database and cache sections from environment variables. The
//! database section is required; a missing connection value surfaces as a
//! configuration error at first pool construction, before any query runs.

use crate::error::{Result, StoreError};
use db_pool::DbConfig;

/// Service name used for metrics labels and revalidation message sources
pub const SERVICE_NAME: &str = "content-store";

/// Main content-store configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database configuration
    pub database: DbConfig,
    /// Cache (Redis) configuration
    pub cache: CacheConfig,
}

/// Cache (Redis) configuration for revalidation events
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Redis URL
    pub url: String,
    /// Pub/sub channel for revalidation messages
    pub channel: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let database = DbConfig::from_env(SERVICE_NAME).map_err(StoreError::from)?;

        Ok(Config {
            database,
            cache: CacheConfig {
                url: std::env::var("REDIS_URL")
                    .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
                channel: std::env::var("CACHE_REVALIDATE_CHANNEL").unwrap_or_else(|_| {
                    cache_revalidate::RevalidationPublisher::DEFAULT_CHANNEL.to_string()
                }),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_required_db_env() {
        std::env::set_var("DB_HOST", "db.internal");
        std::env::set_var("DB_USER", "content");
        std::env::set_var("DB_PASSWORD", "secret");
        std::env::set_var("DB_NAME", "content");
    }

    fn clear_db_env() {
        for key in ["DB_HOST", "DB_USER", "DB_PASSWORD", "DB_NAME"] {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial_test::serial]
    fn test_missing_database_config_is_config_error() {
        clear_db_env();
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, StoreError::Config(_)));
    }

    #[test]
    #[serial_test::serial]
    fn test_cache_defaults() {
        set_required_db_env();
        std::env::remove_var("REDIS_URL");
        std::env::remove_var("CACHE_REVALIDATE_CHANNEL");

        let config = Config::from_env().unwrap();
        assert_eq!(config.cache.url, "redis://localhost:6379");
        assert_eq!(config.cache.channel, "cache:revalidate");
        assert_eq!(config.database.service_name, SERVICE_NAME);

        clear_db_env();
    }
}
