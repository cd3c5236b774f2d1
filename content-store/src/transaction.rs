//! Transaction coordination
//!
//! A transaction pins one pool connection for its whole lifetime; every
//! statement issued through it shares that connection, which guarantees
//! ordering and isolation from concurrent transactions. Every exit path
//! releases the connection: commit and rollback return it explicitly, and
//! dropping an active transaction rolls back (sqlx drop guarantee).
//!
//! Most callers should use [`with_transaction`], which commits on success and
//! rolls back on any error from the body — manual rollback is never needed.

use crate::error::{Result, StatementShape, StoreError};
use crate::executor;
use crate::value::SqlValue;
use futures_util::future::BoxFuture;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use tracing::{debug, error};

/// Lifecycle of one coordinated transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    NotStarted,
    Active,
    Committed,
    RolledBack,
}

/// Explicit begin/commit/rollback coordinator
///
/// State machine: `NotStarted → Active → {Committed, RolledBack}`. Statements
/// issued through an Active coordinator run on the pinned connection; a
/// statement error rolls the transaction back before the error is returned.
pub struct TransactionCoordinator {
    pool: PgPool,
    tx: Option<Transaction<'static, Postgres>>,
    state: TxState,
}

impl TransactionCoordinator {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            tx: None,
            state: TxState::NotStarted,
        }
    }

    pub fn state(&self) -> TxState {
        self.state
    }

    /// Acquire and pin a connection, entering Active state
    pub async fn begin(&mut self) -> Result<()> {
        if self.state == TxState::Active {
            return Err(StoreError::InvalidState("transaction already active"));
        }

        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::from_sqlx(StatementShape::Transaction, e))?;

        self.tx = Some(tx);
        self.state = TxState::Active;
        debug!("Transaction started");
        Ok(())
    }

    /// Query zero-or-more rows on the pinned connection
    pub async fn fetch_all<T>(&mut self, sql: &str, params: Vec<SqlValue>) -> Result<Vec<T>>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let tx = self.active_tx()?;
        match executor::fetch_all(&mut **tx, sql, params).await {
            Ok(rows) => Ok(rows),
            Err(err) => {
                self.rollback_on_error(&err).await;
                Err(err)
            }
        }
    }

    /// Query the first row or none on the pinned connection
    pub async fn fetch_optional<T>(&mut self, sql: &str, params: Vec<SqlValue>) -> Result<Option<T>>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let tx = self.active_tx()?;
        match executor::fetch_optional(&mut **tx, sql, params).await {
            Ok(row) => Ok(row),
            Err(err) => {
                self.rollback_on_error(&err).await;
                Err(err)
            }
        }
    }

    /// Issue a write on the pinned connection, returning rows affected
    pub async fn execute(&mut self, sql: &str, params: Vec<SqlValue>) -> Result<u64> {
        let tx = self.active_tx()?;
        match executor::execute(&mut **tx, sql, params).await {
            Ok(affected) => Ok(affected),
            Err(err) => {
                self.rollback_on_error(&err).await;
                Err(err)
            }
        }
    }

    /// Flush all writes and return the connection to the pool
    pub async fn commit(&mut self) -> Result<()> {
        let tx = self.take_active_tx()?;
        tx.commit()
            .await
            .map_err(|e| StoreError::from_sqlx(StatementShape::Transaction, e))?;
        self.state = TxState::Committed;
        debug!("Transaction committed");
        Ok(())
    }

    /// Revert all writes since begin and return the connection to the pool
    pub async fn rollback(&mut self) -> Result<()> {
        let tx = self.take_active_tx()?;
        tx.rollback()
            .await
            .map_err(|e| StoreError::from_sqlx(StatementShape::Transaction, e))?;
        self.state = TxState::RolledBack;
        debug!("Transaction rolled back");
        Ok(())
    }

    fn active_tx(&mut self) -> Result<&mut Transaction<'static, Postgres>> {
        if self.state != TxState::Active {
            return Err(StoreError::InvalidState("transaction not active"));
        }
        self.tx
            .as_mut()
            .ok_or(StoreError::InvalidState("transaction not active"))
    }

    fn take_active_tx(&mut self) -> Result<Transaction<'static, Postgres>> {
        if self.state != TxState::Active {
            return Err(StoreError::InvalidState("transaction not active"));
        }
        self.tx
            .take()
            .ok_or(StoreError::InvalidState("transaction not active"))
    }

    async fn rollback_on_error(&mut self, cause: &StoreError) {
        error!(error = %cause, "Statement failed inside transaction, rolling back");
        if let Ok(tx) = self.take_active_tx() {
            if let Err(rollback_err) = tx.rollback().await {
                error!(error = %rollback_err, "Rollback after statement failure also failed");
            }
        }
        self.state = TxState::RolledBack;
    }
}

/// Run `body` inside one transaction
///
/// Commits when the body returns `Ok`; rolls back and propagates the error on
/// any `Err`. The body receives the pinned transaction and issues statements
/// through `&mut *tx`.
pub async fn with_transaction<T, F>(pool: &PgPool, body: F) -> Result<T>
where
    F: for<'t> FnOnce(&'t mut Transaction<'static, Postgres>) -> BoxFuture<'t, Result<T>>,
{
    let mut tx = pool
        .begin()
        .await
        .map_err(|e| StoreError::from_sqlx(StatementShape::Transaction, e))?;

    match body(&mut tx).await {
        Ok(value) => {
            tx.commit()
                .await
                .map_err(|e| StoreError::from_sqlx(StatementShape::Transaction, e))?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                error!(error = %rollback_err, "Rollback failed while propagating body error");
            }
            Err(err)
        }
    }
}
