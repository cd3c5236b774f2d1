//! Generic table repositories
//!
//! [`EntityRepository`] composes the query executor and the mutation builder
//! into CRUD over one table described by a [`TableSpec`]. Every identifier in
//! the generated SQL comes from the table spec's static allowlist; caller
//! data is only ever bound positionally. [`SingletonRepository`] specializes the same
//! machinery for tables constrained to at most one row.
//!
//! Per-entity repositories (field mapping, typed create/patch structs,
//! affected public routes) live in the submodules.

pub mod listings;
pub mod live_stream;
pub mod pages;

use crate::error::{Result, StatementShape, StoreError};
use crate::executor;
use crate::models::Identified;
use crate::mutation::MutationBuilder;
use crate::patch::Patch;
use crate::value::SqlValue;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool};
use std::marker::PhantomData;
use tracing::{debug, info};
use uuid::Uuid;

/// Static description of one table
pub struct TableSpec {
    /// Table name
    pub table: &'static str,
    /// Entity label for errors and logs
    pub entity: &'static str,
    /// Full select column list
    pub select_columns: &'static str,
    /// Stable default ordering for list()
    pub default_order: &'static str,
}

/// One column with a supplied value
pub type ColumnValue = (&'static str, SqlValue);

/// One column of a partial update
pub type ColumnPatch = (&'static str, Patch<SqlValue>);

fn insert_sql(spec: &TableSpec, columns: &[&'static str]) -> String {
    let mut names = String::from("id");
    let mut placeholders = String::from("$1");
    for (i, column) in columns.iter().enumerate() {
        names.push_str(", ");
        names.push_str(column);
        placeholders.push_str(&format!(", ${}", i + 2));
    }
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        spec.table, names, placeholders
    )
}

fn update_sql(spec: &TableSpec, set_clause: &str) -> String {
    format!(
        "UPDATE {} SET {}, updated_at = NOW() WHERE id = $1",
        spec.table, set_clause
    )
}

fn select_by_sql(spec: &TableSpec, column: &str) -> String {
    format!(
        "SELECT {} FROM {} WHERE {} = $1",
        spec.select_columns, spec.table, column
    )
}

fn list_sql(spec: &TableSpec, filter_columns: &[&'static str]) -> String {
    let mut sql = format!("SELECT {} FROM {}", spec.select_columns, spec.table);
    for (i, column) in filter_columns.iter().enumerate() {
        sql.push_str(if i == 0 { " WHERE " } else { " AND " });
        sql.push_str(&format!("{} = ${}", column, i + 1));
    }
    sql.push_str(" ORDER BY ");
    sql.push_str(spec.default_order);
    sql
}

/// Overlay a partial update onto seed defaults for a fresh insert
///
/// Supplied values replace defaults; Null drops to a real NULL; Missing keeps
/// the default. Order stays deterministic: defaults first, then new columns
/// in patch order.
fn overlay_defaults(defaults: Vec<ColumnValue>, patches: &[ColumnPatch]) -> Vec<ColumnValue> {
    let mut seed = defaults;
    for (column, patch) in patches {
        let value = match patch {
            Patch::Missing => continue,
            Patch::Null => SqlValue::Null,
            Patch::Value(v) => v.clone(),
        };
        if let Some(existing) = seed.iter_mut().find(|(c, _)| *c == *column) {
            existing.1 = value;
        } else {
            seed.push((*column, value));
        }
    }
    seed
}

/// Generic CRUD over one table
#[derive(Clone)]
pub struct EntityRepository<E> {
    pool: PgPool,
    spec: &'static TableSpec,
    _record: PhantomData<fn() -> E>,
}

impl<E> EntityRepository<E>
where
    E: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    pub fn new(pool: PgPool, spec: &'static TableSpec) -> Self {
        Self {
            pool,
            spec,
            _record: PhantomData,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn spec(&self) -> &'static TableSpec {
        self.spec
    }

    /// Insert a fresh row and return the freshly-read full record
    ///
    /// Generates the id; unsupplied optional columns take their database
    /// defaults. A uniqueness violation (slug collision) surfaces as
    /// [`StoreError::DuplicateKey`].
    pub async fn create(&self, columns: Vec<ColumnValue>) -> Result<E> {
        let id = Uuid::new_v4();
        let names: Vec<&'static str> = columns.iter().map(|(c, _)| *c).collect();
        let sql = insert_sql(self.spec, &names);

        let mut params = Vec::with_capacity(columns.len() + 1);
        params.push(SqlValue::Uuid(id));
        params.extend(columns.into_iter().map(|(_, v)| v));

        executor::execute(&self.pool, &sql, params).await?;
        info!(entity = self.spec.entity, %id, "Created record");

        self.read_back(id).await
    }

    /// Fetch one record by id; absence is not an error
    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<E>> {
        let sql = select_by_sql(self.spec, "id");
        executor::fetch_optional(&self.pool, &sql, vec![SqlValue::Uuid(id)]).await
    }

    /// Fetch one record by slug; absence is not an error
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<E>> {
        let sql = select_by_sql(self.spec, "slug");
        executor::fetch_optional(&self.pool, &sql, vec![SqlValue::Text(slug.to_string())]).await
    }

    /// List records, optionally constrained by equality filters
    pub async fn list(&self, filters: Vec<ColumnValue>) -> Result<Vec<E>> {
        let names: Vec<&'static str> = filters.iter().map(|(c, _)| *c).collect();
        let sql = list_sql(self.spec, &names);
        let params = filters.into_iter().map(|(_, v)| v).collect();
        executor::fetch_all(&self.pool, &sql, params).await
    }

    /// Apply a partial update and return the re-read record
    ///
    /// Fields the caller did not supply stay untouched. With zero supplied
    /// fields no write is issued and the unchanged current record is
    /// returned; otherwise `updated_at` advances with the write.
    pub async fn update(&self, id: Uuid, patches: Vec<ColumnPatch>) -> Result<E> {
        let current = self
            .get_by_id(id)
            .await?
            .ok_or(StoreError::NotFound {
                entity: self.spec.entity,
            })?;

        let mut builder = MutationBuilder::starting_at(2);
        for (column, patch) in patches {
            builder.push(column, patch);
        }

        if builder.is_empty() {
            debug!(entity = self.spec.entity, %id, "Update with no supplied fields, skipping write");
            return Ok(current);
        }

        let sql = update_sql(self.spec, &builder.set_clause());
        let mut params = Vec::with_capacity(builder.len() + 1);
        params.push(SqlValue::Uuid(id));
        params.extend(builder.into_values());

        executor::execute(&self.pool, &sql, params).await?;
        info!(entity = self.spec.entity, %id, "Updated record");

        self.read_back(id).await
    }

    /// Delete by id; returns whether a row was actually removed
    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let sql = format!("DELETE FROM {} WHERE id = $1", self.spec.table);
        let affected = executor::execute(&self.pool, &sql, vec![SqlValue::Uuid(id)]).await?;
        if affected > 0 {
            info!(entity = self.spec.entity, %id, "Deleted record");
        }
        Ok(affected > 0)
    }

    async fn read_back(&self, id: Uuid) -> Result<E> {
        self.get_by_id(id).await?.ok_or(StoreError::Query {
            shape: StatementShape::QuerySingle,
            message: "row missing on read-back after write".to_string(),
        })
    }
}

/// CRUD specialized for a table holding at most one row
///
/// The single-row invariant is enforced by a constant-expression unique index
/// on the table: a concurrent second insert fails with DuplicateKey, which
/// [`SingletonRepository::upsert`] treats as "someone else created it" and
/// falls back to an update of the existing row.
#[derive(Clone)]
pub struct SingletonRepository<E> {
    inner: EntityRepository<E>,
}

impl<E> SingletonRepository<E>
where
    E: for<'r> FromRow<'r, PgRow> + Identified + Send + Unpin,
{
    pub fn new(pool: PgPool, spec: &'static TableSpec) -> Self {
        Self {
            inner: EntityRepository::new(pool, spec),
        }
    }

    /// The sole row, or None if never created
    pub async fn get(&self) -> Result<Option<E>> {
        let spec = self.inner.spec();
        let sql = format!(
            "SELECT {} FROM {} LIMIT 1",
            spec.select_columns, spec.table
        );
        executor::fetch_optional(self.inner.pool(), &sql, Vec::new()).await
    }

    /// Update the sole row, creating it first if absent
    ///
    /// A fresh row is seeded from `defaults` overlaid with the supplied
    /// fields. Lazily created on first upsert; thereafter only updated.
    pub async fn upsert(&self, defaults: Vec<ColumnValue>, patches: Vec<ColumnPatch>) -> Result<E> {
        if let Some(existing) = self.get().await? {
            return self.inner.update(existing.id(), patches).await;
        }

        let seed = overlay_defaults(defaults, &patches);
        match self.inner.create(seed).await {
            Err(StoreError::DuplicateKey { .. }) => {
                // Lost the creation race; the winner's row now exists.
                let existing = self.get().await?.ok_or(StoreError::NotFound {
                    entity: self.inner.spec().entity,
                })?;
                self.inner.update(existing.id(), patches).await
            }
            other => other,
        }
    }
}
