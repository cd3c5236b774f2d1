//! Page repository
//!
//! Owns the pages field mapping (API field names to columns) and the public
//! routes affected by page mutations.

use crate::error::Result;
use crate::models::Page;
use crate::patch::Patch;
use crate::repository::{ColumnPatch, ColumnValue, EntityRepository, TableSpec};
use crate::revalidate::{notify_paths, Revalidator};
use crate::value::SqlValue;
use serde::Deserialize;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

static PAGES: TableSpec = TableSpec {
    table: "pages",
    entity: "page",
    select_columns: "id, title, slug, content, published, created_at, updated_at",
    default_order: "created_at DESC",
};

/// Fields for a fresh page; optional fields take their column defaults
#[derive(Debug, Clone, Deserialize)]
pub struct NewPage {
    pub title: String,
    pub slug: String,
    pub content: String,
    #[serde(default)]
    pub published: Option<bool>,
}

/// Partial update for a page; absent fields stay untouched
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PagePatch {
    #[serde(default)]
    pub title: Patch<String>,
    #[serde(default)]
    pub slug: Patch<String>,
    #[serde(default)]
    pub content: Patch<String>,
    #[serde(default)]
    pub published: Patch<bool>,
}

impl PagePatch {
    fn into_columns(self) -> Vec<ColumnPatch> {
        vec![
            ("title", self.title.map(SqlValue::from)),
            ("slug", self.slug.map(SqlValue::from)),
            ("content", self.content.map(SqlValue::from)),
            ("published", self.published.map(SqlValue::from)),
        ]
    }
}

/// Equality filters for listing pages
#[derive(Debug, Clone, Default)]
pub struct PageFilter {
    pub published: Option<bool>,
}

#[derive(Clone)]
pub struct PageRepository {
    inner: EntityRepository<Page>,
    revalidator: Arc<dyn Revalidator>,
}

impl PageRepository {
    pub fn new(pool: PgPool, revalidator: Arc<dyn Revalidator>) -> Self {
        Self {
            inner: EntityRepository::new(pool, &PAGES),
            revalidator,
        }
    }

    pub async fn create(&self, new: NewPage) -> Result<Page> {
        let mut columns: Vec<ColumnValue> = vec![
            ("title", new.title.into()),
            ("slug", new.slug.into()),
            ("content", new.content.into()),
        ];
        if let Some(published) = new.published {
            columns.push(("published", published.into()));
        }

        let page = self.inner.create(columns).await?;
        notify_paths(&self.revalidator, affected_routes(&page));
        Ok(page)
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Page>> {
        self.inner.get_by_id(id).await
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Page>> {
        self.inner.get_by_slug(slug).await
    }

    pub async fn list(&self, filter: PageFilter) -> Result<Vec<Page>> {
        let mut filters: Vec<ColumnValue> = Vec::new();
        if let Some(published) = filter.published {
            filters.push(("published", published.into()));
        }
        self.inner.list(filters).await
    }

    pub async fn update(&self, id: Uuid, patch: PagePatch) -> Result<Page> {
        // A slug change makes both the old and new route stale.
        let previous_slug = self
            .inner
            .get_by_id(id)
            .await?
            .map(|page| page.slug);

        let page = self.inner.update(id, patch.into_columns()).await?;

        let mut routes = affected_routes(&page);
        if let Some(previous) = previous_slug {
            if previous != page.slug {
                routes.push(format!("/{}", previous));
            }
        }
        notify_paths(&self.revalidator, routes);
        Ok(page)
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let existing = self.inner.get_by_id(id).await?;
        let removed = self.inner.delete(id).await?;
        if removed {
            if let Some(page) = existing {
                notify_paths(&self.revalidator, affected_routes(&page));
            }
        }
        Ok(removed)
    }
}

fn affected_routes(page: &Page) -> Vec<String> {
    vec!["/".to_string(), format!("/{}", page.slug)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_maps_api_fields_to_columns() {
        let patch: PagePatch =
            serde_json::from_str(r#"{"title": "Terms", "published": true}"#).unwrap();
        let columns = patch.into_columns();

        assert_eq!(
            columns,
            vec![
                ("title", Patch::Value(SqlValue::Text("Terms".to_string()))),
                ("slug", Patch::Missing),
                ("content", Patch::Missing),
                ("published", Patch::Value(SqlValue::Bool(true))),
            ]
        );
    }

    #[test]
    fn test_new_page_published_defaults_to_column_default() {
        let new: NewPage =
            serde_json::from_str(r#"{"title": "Terms", "slug": "terms", "content": ""}"#).unwrap();
        assert_eq!(new.published, None);
    }

    #[test]
    fn test_affected_routes_cover_index_and_slug() {
        let page = Page {
            id: Uuid::new_v4(),
            title: "Terms".to_string(),
            slug: "terms".to_string(),
            content: String::new(),
            published: true,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };
        assert_eq!(affected_routes(&page), vec!["/", "/terms"]);
    }
}
