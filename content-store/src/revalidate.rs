//! Revalidation seam between repositories and the cache tier
//!
//! Repositories signal affected public routes after every successful
//! mutation. The signal is fire-and-forget and runs outside the transaction
//! boundary: a failing cache tier can never fail or delay a write.

use async_trait::async_trait;
use cache_revalidate::RevalidationPublisher;
use std::sync::Arc;
use tracing::warn;

/// Downstream collaborator notified of stale public routes
#[async_trait]
pub trait Revalidator: Send + Sync {
    async fn invoke(&self, path: &str) -> anyhow::Result<()>;
}

/// Drops every notification; for tests and hosts without a cache tier
#[derive(Debug, Default)]
pub struct NoopRevalidator;

#[async_trait]
impl Revalidator for NoopRevalidator {
    async fn invoke(&self, _path: &str) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Publishes revalidation events to Redis Pub/Sub
pub struct RedisRevalidator {
    publisher: RevalidationPublisher,
}

impl RedisRevalidator {
    pub fn new(publisher: RevalidationPublisher) -> Self {
        Self { publisher }
    }
}

#[async_trait]
impl Revalidator for RedisRevalidator {
    async fn invoke(&self, path: &str) -> anyhow::Result<()> {
        self.publisher.publish_path(path).await?;
        Ok(())
    }
}

/// Notify each affected route in the background
///
/// Failures are logged and dropped; the caller's mutation result is already
/// committed and does not change.
pub(crate) fn notify_paths(revalidator: &Arc<dyn Revalidator>, paths: Vec<String>) {
    for path in paths {
        let revalidator = Arc::clone(revalidator);
        tokio::spawn(async move {
            if let Err(err) = revalidator.invoke(&path).await {
                warn!(%path, error = %err, "Revalidation notification failed");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingRevalidator(AtomicUsize);

    #[async_trait]
    impl Revalidator for CountingRevalidator {
        async fn invoke(&self, _path: &str) -> anyhow::Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_notify_paths_invokes_once_per_route() {
        let revalidator: Arc<CountingRevalidator> =
            Arc::new(CountingRevalidator(AtomicUsize::new(0)));
        let as_trait: Arc<dyn Revalidator> = revalidator.clone();

        notify_paths(
            &as_trait,
            vec!["/channels".to_string(), "/channels/news-24".to_string()],
        );

        // Spawned tasks; yield until they have run.
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(revalidator.0.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_noop_revalidator_accepts_everything() {
        assert!(NoopRevalidator.invoke("/live").await.is_ok());
    }
}
