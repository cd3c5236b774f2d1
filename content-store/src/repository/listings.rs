//! Channel and streaming-service repositories
//!
//! The `live_streaming_channels` and `streaming_services` tables are
//! column-identical, so one repository type serves both, parametrized by
//! table spec and public route prefix.

use crate::error::Result;
use crate::models::MediaListing;
use crate::patch::Patch;
use crate::repository::{ColumnPatch, ColumnValue, EntityRepository, TableSpec};
use crate::revalidate::{notify_paths, Revalidator};
use crate::value::SqlValue;
use serde::Deserialize;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

static CHANNELS: TableSpec = TableSpec {
    table: "live_streaming_channels",
    entity: "channel",
    select_columns: "id, name, slug, logo_url, description, video_url, content, \
                     featured, display_order, created_at, updated_at",
    default_order: "display_order ASC, name ASC",
};

static STREAMING_SERVICES: TableSpec = TableSpec {
    table: "streaming_services",
    entity: "streaming service",
    select_columns: "id, name, slug, logo_url, description, video_url, content, \
                     featured, display_order, created_at, updated_at",
    default_order: "display_order ASC, name ASC",
};

/// Fields for a fresh listing; optional fields take their column defaults
#[derive(Debug, Clone, Deserialize)]
pub struct NewListing {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub featured: Option<bool>,
    #[serde(default)]
    pub display_order: Option<i32>,
}

/// Partial update for a listing; absent fields stay untouched
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingPatch {
    #[serde(default)]
    pub name: Patch<String>,
    #[serde(default)]
    pub slug: Patch<String>,
    #[serde(default)]
    pub logo_url: Patch<String>,
    #[serde(default)]
    pub description: Patch<String>,
    #[serde(default)]
    pub video_url: Patch<String>,
    #[serde(default)]
    pub content: Patch<String>,
    #[serde(default)]
    pub featured: Patch<bool>,
    #[serde(default)]
    pub display_order: Patch<i32>,
}

impl ListingPatch {
    fn into_columns(self) -> Vec<ColumnPatch> {
        vec![
            ("name", self.name.map(SqlValue::from)),
            ("slug", self.slug.map(SqlValue::from)),
            ("logo_url", self.logo_url.map(SqlValue::from)),
            ("description", self.description.map(SqlValue::from)),
            ("video_url", self.video_url.map(SqlValue::from)),
            ("content", self.content.map(SqlValue::from)),
            ("featured", self.featured.map(SqlValue::from)),
            ("display_order", self.display_order.map(SqlValue::from)),
        ]
    }
}

/// Equality filters for listing queries
#[derive(Debug, Clone, Default)]
pub struct ListingFilter {
    pub featured: Option<bool>,
}

/// Repository over one listing table
#[derive(Clone)]
pub struct ListingRepository {
    inner: EntityRepository<MediaListing>,
    revalidator: Arc<dyn Revalidator>,
    route_prefix: &'static str,
}

impl ListingRepository {
    /// Repository for live-streaming channels, served under `/channels`
    pub fn channels(pool: PgPool, revalidator: Arc<dyn Revalidator>) -> Self {
        Self {
            inner: EntityRepository::new(pool, &CHANNELS),
            revalidator,
            route_prefix: "/channels",
        }
    }

    /// Repository for streaming services, served under `/streaming-services`
    pub fn streaming_services(pool: PgPool, revalidator: Arc<dyn Revalidator>) -> Self {
        Self {
            inner: EntityRepository::new(pool, &STREAMING_SERVICES),
            revalidator,
            route_prefix: "/streaming-services",
        }
    }

    pub async fn create(&self, new: NewListing) -> Result<MediaListing> {
        let mut columns: Vec<ColumnValue> = vec![
            ("name", new.name.into()),
            ("slug", new.slug.into()),
        ];
        // Only supplied optional fields are inserted; the rest keep their
        // column defaults.
        if let Some(logo_url) = new.logo_url {
            columns.push(("logo_url", logo_url.into()));
        }
        if let Some(description) = new.description {
            columns.push(("description", description.into()));
        }
        if let Some(video_url) = new.video_url {
            columns.push(("video_url", video_url.into()));
        }
        if let Some(content) = new.content {
            columns.push(("content", content.into()));
        }
        if let Some(featured) = new.featured {
            columns.push(("featured", featured.into()));
        }
        if let Some(display_order) = new.display_order {
            columns.push(("display_order", display_order.into()));
        }

        let listing = self.inner.create(columns).await?;
        notify_paths(&self.revalidator, self.affected_routes(&listing));
        Ok(listing)
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<MediaListing>> {
        self.inner.get_by_id(id).await
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<MediaListing>> {
        self.inner.get_by_slug(slug).await
    }

    pub async fn list(&self, filter: ListingFilter) -> Result<Vec<MediaListing>> {
        let mut filters: Vec<ColumnValue> = Vec::new();
        if let Some(featured) = filter.featured {
            filters.push(("featured", featured.into()));
        }
        self.inner.list(filters).await
    }

    pub async fn update(&self, id: Uuid, patch: ListingPatch) -> Result<MediaListing> {
        let previous_slug = self
            .inner
            .get_by_id(id)
            .await?
            .map(|listing| listing.slug);

        let listing = self.inner.update(id, patch.into_columns()).await?;

        let mut routes = self.affected_routes(&listing);
        if let Some(previous) = previous_slug {
            if previous != listing.slug {
                routes.push(format!("{}/{}", self.route_prefix, previous));
            }
        }
        notify_paths(&self.revalidator, routes);
        Ok(listing)
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let existing = self.inner.get_by_id(id).await?;
        let removed = self.inner.delete(id).await?;
        if removed {
            if let Some(listing) = existing {
                notify_paths(&self.revalidator, self.affected_routes(&listing));
            }
        }
        Ok(removed)
    }

    fn affected_routes(&self, listing: &MediaListing) -> Vec<String> {
        vec![
            self.route_prefix.to_string(),
            format!("{}/{}", self.route_prefix, listing.slug),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::revalidate::NoopRevalidator;
    use sqlx::postgres::{PgConnectOptions, PgPoolOptions};

    fn lazy_repo(kind: fn(PgPool, Arc<dyn Revalidator>) -> ListingRepository) -> ListingRepository {
        let pool = PgPoolOptions::new().connect_lazy_with(
            PgConnectOptions::new()
                .host("localhost")
                .username("content")
                .database("content_test"),
        );
        kind(pool, Arc::new(NoopRevalidator))
    }

    #[test]
    fn test_patch_null_clears_optional_columns() {
        let patch: ListingPatch =
            serde_json::from_str(r#"{"logo_url": null, "featured": false}"#).unwrap();
        let columns = patch.into_columns();

        assert!(columns.contains(&(("logo_url"), Patch::Null)));
        assert!(columns.contains(&(("featured"), Patch::Value(SqlValue::Bool(false)))));
        assert!(columns.contains(&(("name"), Patch::Missing)));
    }

    #[tokio::test]
    async fn test_channel_routes() {
        let repo = lazy_repo(ListingRepository::channels);
        let listing = sample_listing("news-24");
        assert_eq!(
            repo.affected_routes(&listing),
            vec!["/channels", "/channels/news-24"]
        );
    }

    #[tokio::test]
    async fn test_streaming_service_routes() {
        let repo = lazy_repo(ListingRepository::streaming_services);
        let listing = sample_listing("streamflix");
        assert_eq!(
            repo.affected_routes(&listing),
            vec!["/streaming-services", "/streaming-services/streamflix"]
        );
    }

    fn sample_listing(slug: &str) -> MediaListing {
        MediaListing {
            id: Uuid::new_v4(),
            name: slug.to_string(),
            slug: slug.to_string(),
            logo_url: None,
            description: None,
            video_url: None,
            content: None,
            featured: false,
            display_order: 0,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }
}
