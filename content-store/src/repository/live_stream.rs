//! Singleton live-stream landing page repository
//!
//! The `live_stream_page` table holds at most one row, enforced by a
//! constant-expression unique index. The row is created lazily on the first
//! upsert and only updated afterwards.

use crate::error::Result;
use crate::models::LiveStreamPage;
use crate::patch::Patch;
use crate::repository::{ColumnPatch, ColumnValue, SingletonRepository, TableSpec};
use crate::revalidate::{notify_paths, Revalidator};
use crate::value::SqlValue;
use serde::Deserialize;
use sqlx::PgPool;
use std::sync::Arc;

static LIVE_STREAM_PAGE: TableSpec = TableSpec {
    table: "live_stream_page",
    entity: "live stream page",
    select_columns: "id, title, content, video_url, updated_at",
    default_order: "updated_at DESC",
};

/// Route whose cached render the singleton backs
const LIVE_ROUTE: &str = "/live";

/// Partial update for the live-stream page; absent fields stay untouched
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LiveStreamPatch {
    #[serde(default)]
    pub title: Patch<String>,
    #[serde(default)]
    pub content: Patch<String>,
    #[serde(default)]
    pub video_url: Patch<String>,
}

impl LiveStreamPatch {
    fn into_columns(self) -> Vec<ColumnPatch> {
        vec![
            ("title", self.title.map(SqlValue::from)),
            ("content", self.content.map(SqlValue::from)),
            ("video_url", self.video_url.map(SqlValue::from)),
        ]
    }
}

fn seed_defaults() -> Vec<ColumnValue> {
    vec![("title", "".into()), ("content", "".into())]
}

#[derive(Clone)]
pub struct LiveStreamPageRepository {
    inner: SingletonRepository<LiveStreamPage>,
    revalidator: Arc<dyn Revalidator>,
}

impl LiveStreamPageRepository {
    pub fn new(pool: PgPool, revalidator: Arc<dyn Revalidator>) -> Self {
        Self {
            inner: SingletonRepository::new(pool, &LIVE_STREAM_PAGE),
            revalidator,
        }
    }

    /// The sole row, or None if never created
    pub async fn get(&self) -> Result<Option<LiveStreamPage>> {
        self.inner.get().await
    }

    /// Update the page, creating it on first use
    pub async fn upsert(&self, patch: LiveStreamPatch) -> Result<LiveStreamPage> {
        let page = self
            .inner
            .upsert(seed_defaults(), patch.into_columns())
            .await?;
        notify_paths(&self.revalidator, vec![LIVE_ROUTE.to_string()]);
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_distinguishes_null_from_absent() {
        let patch: LiveStreamPatch =
            serde_json::from_str(r#"{"title": "Live", "video_url": null}"#).unwrap();
        let columns = patch.into_columns();

        assert_eq!(
            columns,
            vec![
                ("title", Patch::Value(SqlValue::Text("Live".to_string()))),
                ("content", Patch::Missing),
                ("video_url", Patch::Null),
            ]
        );
    }

    #[test]
    fn test_seed_defaults_cover_required_columns() {
        assert_eq!(
            seed_defaults(),
            vec![
                ("title", SqlValue::Text(String::new())),
                ("content", SqlValue::Text(String::new())),
            ]
        );
    }
}
