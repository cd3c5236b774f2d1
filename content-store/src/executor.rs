//! Parameterized statement execution
//!
//! Thin layer over sqlx that binds an ordered [`SqlValue`] list and
//! translates driver failures into the store's error taxonomy. The functions
//! are generic over [`sqlx::PgExecutor`], so the same code path serves
//! ephemeral pool statements and statements pinned to a transaction; sqlx
//! releases the underlying connection on both success and failure.

use crate::error::{Result, StatementShape, StoreError};
use crate::value::SqlValue;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgExecutor};
use tracing::debug;

/// Execute a query expecting zero or more rows
pub async fn fetch_all<'e, E, T>(executor: E, sql: &str, params: Vec<SqlValue>) -> Result<Vec<T>>
where
    E: PgExecutor<'e>,
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    debug!(shape = %StatementShape::Query, params = params.len(), "Executing statement");

    let mut query = sqlx::query_as::<_, T>(sql);
    for value in params {
        query = value.bind_query_as(query);
    }

    query
        .fetch_all(executor)
        .await
        .map_err(|e| StoreError::from_sqlx(StatementShape::Query, e))
}

/// Execute a query expecting the first row or none
pub async fn fetch_optional<'e, E, T>(
    executor: E,
    sql: &str,
    params: Vec<SqlValue>,
) -> Result<Option<T>>
where
    E: PgExecutor<'e>,
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    debug!(shape = %StatementShape::QuerySingle, params = params.len(), "Executing statement");

    let mut query = sqlx::query_as::<_, T>(sql);
    for value in params {
        query = value.bind_query_as(query);
    }

    query
        .fetch_optional(executor)
        .await
        .map_err(|e| StoreError::from_sqlx(StatementShape::QuerySingle, e))
}

/// Execute a write, returning rows affected
pub async fn execute<'e, E>(executor: E, sql: &str, params: Vec<SqlValue>) -> Result<u64>
where
    E: PgExecutor<'e>,
{
    debug!(shape = %StatementShape::Write, params = params.len(), "Executing statement");

    let mut query = sqlx::query(sql);
    for value in params {
        query = value.bind_query(query);
    }

    query
        .execute(executor)
        .await
        .map(|done| done.rows_affected())
        .map_err(|e| StoreError::from_sqlx(StatementShape::Write, e))
}
