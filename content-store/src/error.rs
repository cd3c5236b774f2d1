//! Error types for the content store
//!
//! Driver-specific failures are translated into this taxonomy at the
//! executor and pool boundaries and never swallowed. `Query` errors carry the
//! statement shape and the driver message only — never SQL text or bound
//! values, so sensitive data cannot leak into logs.

use db_pool::PoolError;
use std::fmt;
use thiserror::Error;

/// Result type for content-store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// The shape of the statement that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementShape {
    /// Zero-or-more rows expected
    Query,
    /// First row or none expected
    QuerySingle,
    /// Rows-affected expected
    Write,
    /// Transaction control (begin/commit/rollback)
    Transaction,
}

impl fmt::Display for StatementShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatementShape::Query => write!(f, "query"),
            StatementShape::QuerySingle => write!(f, "query-single"),
            StatementShape::Write => write!(f, "write"),
            StatementShape::Transaction => write!(f, "transaction"),
        }
    }
}

/// Content store error taxonomy
#[derive(Debug, Error)]
pub enum StoreError {
    /// Missing or invalid connection configuration; fatal at first use
    #[error("configuration error: {0}")]
    Config(String),

    /// No connection became available before the deadline; retryable
    #[error("connection pool exhausted after {waited_ms}ms")]
    PoolExhausted { waited_ms: u64 },

    /// Driver failure executing a statement
    #[error("query failed ({shape}): {message}")]
    Query {
        shape: StatementShape,
        message: String,
    },

    /// Uniqueness violation; recoverable, drives the singleton upsert fallback
    #[error("duplicate key: {constraint}")]
    DuplicateKey { constraint: String },

    /// Update or delete against an id that does not exist
    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    /// Operation not valid for the transaction's current state
    #[error("invalid transaction state: {0}")]
    InvalidState(&'static str),
}

impl StoreError {
    /// Translate a driver error for a statement of the given shape
    ///
    /// Unique violations (SQLSTATE 23505) become [`StoreError::DuplicateKey`]
    /// and pool acquire timeouts become [`StoreError::PoolExhausted`];
    /// everything else surfaces as [`StoreError::Query`] with the driver
    /// message.
    pub fn from_sqlx(shape: StatementShape, err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::PoolTimedOut => return StoreError::PoolExhausted { waited_ms: 0 },
            sqlx::Error::Database(db) => {
                if db.code().as_deref() == Some("23505") {
                    return StoreError::DuplicateKey {
                        constraint: db
                            .constraint()
                            .unwrap_or("unique constraint")
                            .to_string(),
                    };
                }
            }
            _ => {}
        }

        StoreError::Query {
            shape,
            message: err.to_string(),
        }
    }

    /// Whether a caller may reasonably retry the failed operation
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::PoolExhausted { .. })
    }
}

impl From<PoolError> for StoreError {
    fn from(err: PoolError) -> Self {
        match err {
            PoolError::Config(msg) => StoreError::Config(msg),
            PoolError::Exhausted { waited_ms } => StoreError::PoolExhausted { waited_ms },
            PoolError::Driver(e) => StoreError::from_sqlx(StatementShape::Transaction, e),
        }
    }
}
