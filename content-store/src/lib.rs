//! Content persistence layer
//!
//! Safe mutation plus connection and transaction management for the site's
//! content entities: pages, live-streaming channels, streaming services, and
//! the singleton live-stream landing page. Route handlers consume the
//! repositories in this crate; everything above them (rendering, locale
//! handling, auth) lives elsewhere.
//!
//! # Modules
//!
//! - `config`: Configuration management
//! - `error`: Error taxonomy and driver-error translation
//! - `executor`: Parameterized statement execution
//! - `transaction`: Transaction coordination and the scoped helper
//! - `patch` / `value` / `mutation`: Partial-update building blocks
//! - `models`: Persisted record types
//! - `repository`: Generic and per-entity repositories
//! - `revalidate`: Post-mutation cache revalidation seam

pub mod config;
pub mod error;
pub mod executor;
pub mod models;
pub mod mutation;
pub mod patch;
pub mod repository;
pub mod revalidate;
pub mod transaction;
pub mod value;

pub use config::Config;
pub use error::{Result, StatementShape, StoreError};
pub use models::{LiveStreamPage, MediaListing, Page};
pub use mutation::MutationBuilder;
pub use patch::Patch;
pub use repository::listings::{ListingFilter, ListingPatch, ListingRepository, NewListing};
pub use repository::live_stream::{LiveStreamPageRepository, LiveStreamPatch};
pub use repository::pages::{NewPage, PageFilter, PagePatch, PageRepository};
pub use repository::{EntityRepository, SingletonRepository, TableSpec};
pub use transaction::{with_transaction, TransactionCoordinator, TxState};
pub use value::SqlValue;

use sqlx::PgPool;

/// Apply the embedded schema migrations
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| StoreError::Query {
            shape: StatementShape::Write,
            message: e.to_string(),
        })
}
