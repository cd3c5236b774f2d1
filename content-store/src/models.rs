//! Persisted content records
//!
//! One record type per table shape. `MediaListing` backs both the
//! `live_streaming_channels` and `streaming_services` tables, which are
//! column-identical. Ids are opaque and never change after creation;
//! timestamps are store-maintained.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Records that expose their immutable row id
pub trait Identified {
    fn id(&self) -> Uuid;
}

/// A static content page (terms, about, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Page {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Identified for Page {
    fn id(&self) -> Uuid {
        self.id
    }
}

/// A live-streaming channel or streaming service listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct MediaListing {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub logo_url: Option<String>,
    pub description: Option<String>,
    pub video_url: Option<String>,
    pub content: Option<String>,
    pub featured: bool,
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Identified for MediaListing {
    fn id(&self) -> Uuid {
        self.id
    }
}

/// The singleton live-stream landing page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct LiveStreamPage {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub video_url: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Identified for LiveStreamPage {
    fn id(&self) -> Uuid {
        self.id
    }
}
