//! In-process read-through cache for the privileged recipient listing.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache as MokaCache;

use crate::recipients::Recipient;

/// Key under which the full recipient list is stored.
pub const ALL_RECIPIENTS: &str = "all_recipients";

/// Default lifetime of a cached listing.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Cache of the complete recipient listing.
#[derive(Clone)]
pub struct RecipientCache {
    inner: MokaCache<&'static str, Arc<Vec<Recipient>>>,
}

impl RecipientCache {
    /// Create a cache whose entries expire after `ttl`.
    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        let inner = MokaCache::builder()
            .max_capacity(1)
            .time_to_live(ttl)
            .build();
        Self { inner }
    }

    /// Cached listing, if present and fresh.
    pub async fn get(&self) -> Option<Arc<Vec<Recipient>>> {
        self.inner.get(ALL_RECIPIENTS).await
    }

    /// Store a freshly loaded listing.
    pub async fn put(&self, recipients: Arc<Vec<Recipient>>) {
        self.inner.insert(ALL_RECIPIENTS, recipients).await;
    }

    /// Drop the cached listing.
    pub async fn invalidate(&self) {
        self.inner.invalidate(ALL_RECIPIENTS).await;
    }
}

impl Default for RecipientCache {
    fn default() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }
}

impl std::fmt::Debug for RecipientCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecipientCache")
            .field("entries", &self.inner.entry_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipients::RecipientId;

    fn sample() -> Arc<Vec<Recipient>> {
        Arc::new(vec![Recipient {
            id: RecipientId(1),
            email: "a@example.com".into(),
            full_name: "A".into(),
            comment: "c".into(),
            owner_id: None,
        }])
    }

    #[tokio::test]
    async fn test_put_get_invalidate() {
        let cache = RecipientCache::default();
        assert!(cache.get().await.is_none());

        cache.put(sample()).await;
        assert_eq!(cache.get().await.map(|r| r.len()), Some(1));

        cache.invalidate().await;
        assert!(cache.get().await.is_none());
    }

    #[tokio::test]
    async fn test_entries_expire() {
        let cache = RecipientCache::with_ttl(Duration::from_millis(20));
        cache.put(sample()).await;
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(cache.get().await.is_none());
    }
}
