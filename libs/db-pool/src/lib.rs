//! Database connection pool management
//!
//! Provides pool construction and bounded-wait acquisition for the content
//! store. The pool is built explicitly by the host at startup and passed down
//! by reference; there is no global pool state.

mod metrics;

use metrics::{record_acquire, update_pool_metrics};

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgSslMode};
use sqlx::pool::PoolConnection;
use sqlx::Postgres;
use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info};

/// Pool construction and acquisition errors
#[derive(Debug, Error)]
pub enum PoolError {
    /// Required connection configuration is missing or invalid
    #[error("configuration error: {0}")]
    Config(String),

    /// No connection became available before the deadline
    #[error("connection pool exhausted after {waited_ms}ms")]
    Exhausted { waited_ms: u64 },

    /// Underlying driver failure
    #[error(transparent)]
    Driver(#[from] sqlx::Error),
}

/// Database connection pool configuration
#[derive(Clone)]
pub struct DbConfig {
    /// Service name for metrics labeling
    pub service_name: String,
    /// Database server host
    pub host: String,
    /// Database server port
    pub port: u16,
    /// Database user
    pub user: String,
    /// Database credential
    pub password: String,
    /// Database name
    pub database: String,
    /// Require TLS on the connection
    pub tls_enabled: bool,
    /// Maximum number of connections
    pub max_connections: u32,
    /// Minimum number of connections
    pub min_connections: u32,
    /// Connection acquisition timeout (get connection from pool)
    pub acquire_timeout_secs: u64,
    /// Connection idle timeout
    pub idle_timeout_secs: u64,
    /// Connection maximum lifetime
    pub max_lifetime_secs: u64,
    /// Health-check connections before handing them out
    pub keepalive: bool,
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("service_name", &self.service_name)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("database", &self.database)
            .field("tls_enabled", &self.tls_enabled)
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .field("acquire_timeout_secs", &self.acquire_timeout_secs)
            .field("idle_timeout_secs", &self.idle_timeout_secs)
            .field("max_lifetime_secs", &self.max_lifetime_secs)
            .field("keepalive", &self.keepalive)
            .finish()
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            service_name: String::from("unknown"),
            host: String::new(),
            port: 5432,
            user: String::new(),
            password: String::new(),
            database: String::new(),
            tls_enabled: false,
            max_connections: 10,
            min_connections: 1,
            acquire_timeout_secs: 10,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
            keepalive: true,
        }
    }
}

impl DbConfig {
    /// Create a new DbConfig from environment variables
    ///
    /// `DB_HOST`, `DB_USER`, `DB_PASSWORD` and `DB_NAME` are required; the
    /// rest fall back to defaults.
    pub fn from_env(service_name: &str) -> Result<Self, PoolError> {
        let required = |key: &str| -> Result<String, PoolError> {
            std::env::var(key)
                .map_err(|_| PoolError::Config(format!("{} environment variable not set", key)))
        };

        Ok(Self {
            service_name: service_name.to_string(),
            host: required("DB_HOST")?,
            port: std::env::var("DB_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5432),
            user: required("DB_USER")?,
            password: required("DB_PASSWORD")?,
            database: required("DB_NAME")?,
            tls_enabled: std::env::var("DB_TLS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            max_connections: std::env::var("DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            min_connections: std::env::var("DB_MIN_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1),
            acquire_timeout_secs: std::env::var("DB_ACQUIRE_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            idle_timeout_secs: std::env::var("DB_IDLE_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(600),
            max_lifetime_secs: std::env::var("DB_MAX_LIFETIME_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1800),
            keepalive: std::env::var("DB_KEEPALIVE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
        })
    }

    /// Validate required connection parameters
    pub fn validate(&self) -> Result<(), PoolError> {
        for (field, value) in [
            ("host", &self.host),
            ("user", &self.user),
            ("password", &self.password),
            ("database", &self.database),
        ] {
            if value.trim().is_empty() {
                return Err(PoolError::Config(format!(
                    "database {} must not be empty",
                    field
                )));
            }
        }
        if self.max_connections == 0 {
            return Err(PoolError::Config(
                "max_connections must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.database)
            .ssl_mode(if self.tls_enabled {
                PgSslMode::Require
            } else {
                PgSslMode::Prefer
            })
    }

    /// Log pool configuration details
    pub fn log_config(&self) {
        info!(
            "Database Pool Configuration: \
             host={}, database={}, max_connections={}, min_connections={}, \
             acquire_timeout={}s, idle_timeout={}s, max_lifetime={}s, keepalive={}",
            self.host,
            self.database,
            self.max_connections,
            self.min_connections,
            self.acquire_timeout_secs,
            self.idle_timeout_secs,
            self.max_lifetime_secs,
            self.keepalive
        );
    }
}

/// Create a PostgreSQL connection pool with automatic metrics monitoring
///
/// Fails with [`PoolError::Config`] before any connection attempt when the
/// required connection parameters are missing.
pub async fn create_pool(config: DbConfig) -> Result<PgPool, PoolError> {
    config.validate()?;

    debug!(
        "Creating database pool: service={}, host={}, database={}, max={}, min={}",
        config.service_name, config.host, config.database, config.max_connections,
        config.min_connections
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        // Timeout for acquiring a connection from the pool
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        // Close connections idle for longer than this
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        // Maximum lifetime of a connection (to handle stale connections)
        .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
        .test_before_acquire(config.keepalive)
        .connect_with(config.connect_options())
        .await?;

    // Verify the pool with a trivial round trip before handing it out
    match sqlx::query("SELECT 1").execute(&pool).await {
        Ok(_) => {
            info!(
                service = %config.service_name,
                "Database pool created and verified successfully"
            );

            update_pool_metrics(&pool, &config.service_name);

            // Background metrics updater for the pool's lifetime
            {
                let pool_clone = pool.clone();
                let service = config.service_name.clone();
                tokio::spawn(async move {
                    let mut interval = tokio::time::interval(Duration::from_secs(30));
                    loop {
                        interval.tick().await;
                        update_pool_metrics(&pool_clone, &service);
                    }
                });
            }

            Ok(pool)
        }
        Err(e) => {
            error!(
                service = %config.service_name,
                error = %e,
                "Database connection verification failed"
            );
            Err(PoolError::Driver(e))
        }
    }
}

/// Acquire a connection, waiting at most `deadline`
///
/// Drop-in replacement for `pool.acquire().await` that bounds the wait with
/// the caller's deadline instead of the pool-wide acquire timeout, and
/// records acquisition latency. Exceeding the deadline fails with
/// [`PoolError::Exhausted`] rather than hanging.
pub async fn acquire_with_deadline(
    pool: &PgPool,
    service: &str,
    deadline: Duration,
) -> Result<PoolConnection<Postgres>, PoolError> {
    let start = Instant::now();
    let result = tokio::time::timeout(deadline, pool.acquire()).await;
    let waited = start.elapsed();

    record_acquire(service, waited, result.as_ref().map_or(true, |r| r.is_err()));

    match result {
        Ok(Ok(conn)) => Ok(conn),
        Ok(Err(sqlx::Error::PoolTimedOut)) | Err(_) => Err(PoolError::Exhausted {
            waited_ms: waited.as_millis() as u64,
        }),
        Ok(Err(e)) => Err(PoolError::Driver(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_config() -> DbConfig {
        DbConfig {
            service_name: "pool-test".to_string(),
            host: "localhost".to_string(),
            user: "content".to_string(),
            password: "secret".to_string(),
            database: "content_test".to_string(),
            ..DbConfig::default()
        }
    }

    #[test]
    fn test_validate_complete_config() {
        assert!(complete_config().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_fields() {
        for missing in ["host", "user", "password", "database"] {
            let mut config = complete_config();
            match missing {
                "host" => config.host.clear(),
                "user" => config.user.clear(),
                "password" => config.password.clear(),
                _ => config.database.clear(),
            }
            let err = config.validate().unwrap_err();
            assert!(
                matches!(err, PoolError::Config(ref msg) if msg.contains(missing)),
                "expected Config error naming {}, got {}",
                missing,
                err
            );
        }
    }

    #[test]
    fn test_validate_rejects_zero_ceiling() {
        let mut config = complete_config();
        config.max_connections = 0;
        assert!(matches!(config.validate(), Err(PoolError::Config(_))));
    }

    #[test]
    fn test_debug_redacts_credential() {
        let config = complete_config();
        let rendered = format!("{:?}", config);
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("secret"));
    }

    #[test]
    #[serial_test::serial]
    fn test_from_env_requires_connection_params() {
        std::env::remove_var("DB_HOST");
        std::env::remove_var("DB_USER");
        std::env::remove_var("DB_PASSWORD");
        std::env::remove_var("DB_NAME");

        let err = DbConfig::from_env("pool-test").unwrap_err();
        assert!(matches!(err, PoolError::Config(ref msg) if msg.contains("DB_HOST")));
    }

    #[test]
    #[serial_test::serial]
    fn test_from_env_defaults() {
        std::env::set_var("DB_HOST", "db.internal");
        std::env::set_var("DB_USER", "content");
        std::env::set_var("DB_PASSWORD", "secret");
        std::env::set_var("DB_NAME", "content");
        std::env::remove_var("DB_PORT");
        std::env::remove_var("DB_TLS");
        std::env::remove_var("DB_MAX_CONNECTIONS");
        std::env::remove_var("DB_MIN_CONNECTIONS");
        std::env::remove_var("DB_ACQUIRE_TIMEOUT_SECS");
        std::env::remove_var("DB_IDLE_TIMEOUT_SECS");
        std::env::remove_var("DB_MAX_LIFETIME_SECS");
        std::env::remove_var("DB_KEEPALIVE");

        let config = DbConfig::from_env("pool-test").unwrap();
        assert_eq!(config.service_name, "pool-test");
        assert_eq!(config.host, "db.internal");
        assert_eq!(config.port, 5432);
        assert!(!config.tls_enabled);
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 1);
        assert_eq!(config.acquire_timeout_secs, 10);
        assert!(config.keepalive);

        for key in ["DB_HOST", "DB_USER", "DB_PASSWORD", "DB_NAME"] {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial_test::serial]
    fn test_from_env_overrides() {
        std::env::set_var("DB_HOST", "db.internal");
        std::env::set_var("DB_USER", "content");
        std::env::set_var("DB_PASSWORD", "secret");
        std::env::set_var("DB_NAME", "content");
        std::env::set_var("DB_PORT", "6432");
        std::env::set_var("DB_TLS", "true");
        std::env::set_var("DB_MAX_CONNECTIONS", "25");

        let config = DbConfig::from_env("pool-test").unwrap();
        assert_eq!(config.port, 6432);
        assert!(config.tls_enabled);
        assert_eq!(config.max_connections, 25);

        for key in [
            "DB_HOST",
            "DB_USER",
            "DB_PASSWORD",
            "DB_NAME",
            "DB_PORT",
            "DB_TLS",
            "DB_MAX_CONNECTIONS",
        ] {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_pool_exhausted_display() {
        let err = PoolError::Exhausted { waited_ms: 2500 };
        assert_eq!(err.to_string(), "connection pool exhausted after 2500ms");
    }
}
