//! Prometheus metrics for the database connection pool
//!
//! Tracks pool size, connection acquisition latency, and deadline misses

use prometheus::{register_histogram_vec, register_int_gauge_vec, HistogramVec, IntGaugeVec};
use sqlx::PgPool;
use std::time::Duration;

lazy_static::lazy_static! {
    /// Database connection pool size by state (idle/active/max)
    static ref DB_POOL_CONNECTIONS: IntGaugeVec = register_int_gauge_vec!(
        "db_pool_connections",
        "Database pool connection count by state",
        &["service", "state"]
    ).expect("Prometheus metrics registration should succeed at startup");

    /// Time to acquire a connection from the pool
    static ref DB_POOL_ACQUIRE_DURATION: HistogramVec = register_histogram_vec!(
        "db_pool_acquire_duration_seconds",
        "Time to acquire connection from pool",
        &["service"],
        vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0]
    ).expect("Prometheus metrics registration should succeed at startup");

    /// Acquisitions that missed their deadline or failed outright
    static ref DB_POOL_ACQUIRE_FAILURES: IntGaugeVec = register_int_gauge_vec!(
        "db_pool_acquire_failures_total",
        "Connection acquisitions that failed or timed out",
        &["service"]
    ).expect("Prometheus metrics registration should succeed at startup");
}

/// Update connection pool metrics (called periodically)
pub(crate) fn update_pool_metrics(pool: &PgPool, service: &str) {
    let size = pool.size() as i64;
    let idle = pool.num_idle() as i64;
    let active = size - idle;

    DB_POOL_CONNECTIONS
        .with_label_values(&[service, "idle"])
        .set(idle);

    DB_POOL_CONNECTIONS
        .with_label_values(&[service, "active"])
        .set(active);

    DB_POOL_CONNECTIONS
        .with_label_values(&[service, "max"])
        .set(pool.options().get_max_connections() as i64);
}

/// Record one acquisition attempt
pub(crate) fn record_acquire(service: &str, waited: Duration, failed: bool) {
    DB_POOL_ACQUIRE_DURATION
        .with_label_values(&[service])
        .observe(waited.as_secs_f64());

    if failed {
        DB_POOL_ACQUIRE_FAILURES
            .with_label_values(&[service])
            .inc();
    }
}
