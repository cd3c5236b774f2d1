//! Page revalidation events over Redis Pub/Sub
//!
//! After a successful content mutation, the persistence layer publishes one
//! revalidation message per affected public route. Render hosts subscribe and
//! re-render (or drop) the cached page for that route. Publishing happens
//! after commit and is fire-and-forget: persistence correctness never depends
//! on the cache tier being reachable.
//!
//! ```text
//! content-store:
//!   1. Commit content mutation to Postgres
//!   2. Publish revalidation to Redis:
//!      PUBLISH cache:revalidate {"path": "/channels/news-24"}
//!      ↓
//! Redis Pub/Sub (broadcast to all subscribers)
//!      ↓
//! Render hosts:
//!   3. Receive revalidation message
//!   4. Invalidate the cached render for that path
//! ```
//!
//! # Example: Publisher
//!
//! ```no_run
//! use cache_revalidate::RevalidationPublisher;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let publisher = RevalidationPublisher::new(
//!         "redis://localhost:6379",
//!         "content-store".to_string()
//!     ).await?;
//!
//!     publisher.publish_path("/channels/news-24").await?;
//!     Ok(())
//! }
//! ```

use futures_util::StreamExt;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

mod error;

pub use error::RevalidateError;

type Result<T> = std::result::Result<T, RevalidateError>;

/// One stale-route notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevalidationMessage {
    pub message_id: String,
    /// Public route whose cached render is now stale, e.g. `/channels/news-24`
    pub path: String,
    pub source_service: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl RevalidationMessage {
    pub fn new(path: impl Into<String>, source_service: String) -> Self {
        Self {
            message_id: uuid::Uuid::new_v4().to_string(),
            path: path.into(),
            source_service,
            timestamp: chrono::Utc::now(),
        }
    }
}

/// Publisher for revalidation events
#[derive(Clone)]
pub struct RevalidationPublisher {
    client: ConnectionManager,
    channel: String,
    service_name: String,
}

impl RevalidationPublisher {
    /// Default Redis channel for revalidation events
    pub const DEFAULT_CHANNEL: &'static str = "cache:revalidate";

    /// Create new publisher
    pub async fn new(redis_url: &str, service_name: String) -> Result<Self> {
        let client = Client::open(redis_url)?;
        let connection = ConnectionManager::new(client).await?;

        Ok(Self {
            client: connection,
            channel: Self::DEFAULT_CHANNEL.to_string(),
            service_name,
        })
    }

    /// Create publisher with custom channel
    pub async fn with_channel(
        redis_url: &str,
        service_name: String,
        channel: String,
    ) -> Result<Self> {
        let client = Client::open(redis_url)?;
        let connection = ConnectionManager::new(client).await?;

        Ok(Self {
            client: connection,
            channel,
            service_name,
        })
    }

    /// Publish one revalidation message
    ///
    /// Returns number of subscribers that received the message
    pub async fn publish(&self, msg: RevalidationMessage) -> Result<usize> {
        let payload = serde_json::to_string(&msg)?;

        debug!(
            message_id = %msg.message_id,
            path = %msg.path,
            channel = %self.channel,
            "Publishing revalidation message"
        );

        let mut conn = self.client.clone();
        let subscriber_count: usize = conn.publish(&self.channel, payload).await?;

        info!(
            message_id = %msg.message_id,
            path = %msg.path,
            subscribers = subscriber_count,
            "Revalidation message published"
        );

        Ok(subscriber_count)
    }

    /// Mark one public route stale
    pub async fn publish_path(&self, path: &str) -> Result<usize> {
        let msg = RevalidationMessage::new(path, self.service_name.clone());
        self.publish(msg).await
    }
}

/// Subscriber for revalidation events
pub struct RevalidationSubscriber {
    client: Client,
    channel: String,
}

impl RevalidationSubscriber {
    /// Create new subscriber on the default channel
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url)?;

        Ok(Self {
            client,
            channel: RevalidationPublisher::DEFAULT_CHANNEL.to_string(),
        })
    }

    /// Create subscriber with custom channel
    pub async fn with_channel(redis_url: &str, channel: String) -> Result<Self> {
        let client = Client::open(redis_url)?;

        Ok(Self { client, channel })
    }

    /// Subscribe to revalidation events with callback
    ///
    /// Returns JoinHandle for the background consumer task. Malformed
    /// payloads are logged and skipped; a failing callback never ends the
    /// subscription.
    pub async fn subscribe<F, Fut>(&self, callback: F) -> Result<JoinHandle<()>>
    where
        F: Fn(RevalidationMessage) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(&self.channel).await?;

        info!(channel = %self.channel, "Subscribed to revalidation events");

        let callback = Arc::new(callback);

        let handle = tokio::spawn(async move {
            let mut stream = pubsub.on_message();

            while let Some(msg) = stream.next().await {
                let payload = match msg.get_payload::<String>() {
                    Ok(p) => p,
                    Err(e) => {
                        error!(error = ?e, "Failed to get message payload");
                        continue;
                    }
                };

                let revalidation: RevalidationMessage = match serde_json::from_str(&payload) {
                    Ok(m) => m,
                    Err(e) => {
                        error!(error = ?e, payload = %payload, "Failed to deserialize message");
                        continue;
                    }
                };

                debug!(
                    message_id = %revalidation.message_id,
                    path = %revalidation.path,
                    "Received revalidation message"
                );

                let callback_clone = Arc::clone(&callback);
                if let Err(e) = callback_clone(revalidation.clone()).await {
                    error!(
                        error = ?e,
                        message_id = %revalidation.message_id,
                        path = %revalidation.path,
                        "Revalidation callback failed"
                    );
                }
            }

            warn!("Revalidation subscription ended");
        });

        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_carries_path_and_source() {
        let msg = RevalidationMessage::new("/channels/news-24", "content-store".to_string());

        assert_eq!(msg.path, "/channels/news-24");
        assert_eq!(msg.source_service, "content-store");
        assert!(!msg.message_id.is_empty());
    }

    #[test]
    fn test_message_ids_are_unique() {
        let a = RevalidationMessage::new("/live", "content-store".to_string());
        let b = RevalidationMessage::new("/live", "content-store".to_string());
        assert_ne!(a.message_id, b.message_id);
    }

    #[test]
    fn test_message_serde_roundtrip() {
        let msg = RevalidationMessage::new("/terms", "content-store".to_string());
        let payload = serde_json::to_string(&msg).unwrap();
        let parsed: RevalidationMessage = serde_json::from_str(&payload).unwrap();

        assert_eq!(parsed.message_id, msg.message_id);
        assert_eq!(parsed.path, msg.path);
        assert_eq!(parsed.timestamp, msg.timestamp);
    }

    #[test]
    fn test_default_channel() {
        assert_eq!(RevalidationPublisher::DEFAULT_CHANNEL, "cache:revalidate");
    }
}
