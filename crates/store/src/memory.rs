//! In-memory cache backend using DashMap.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use aggregator_core::{traits::CacheBackend, Result};

/// Cached value with expiration.
#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Process-local cache for single-instance deployments and tests.
///
/// Expiry uses tokio's clock, so paused-time tests can advance past it.
/// Reading an expired key removes it; keys that are never read again are
/// swept by [`cleanup`](Self::cleanup), which [`spawn_cleanup`](Self::spawn_cleanup)
/// runs on an interval.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: DashMap<String, CacheEntry>,
}

impl InMemoryCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included until they are read
    /// or swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether a live entry exists for `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .map(|entry| !entry.is_expired())
            .unwrap_or(false)
    }

    /// Drop expired entries.
    pub fn cleanup(&self) {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired());
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            tracing::debug!(removed = removed, remaining = self.entries.len(), "Swept expired cache entries");
        }
    }

    /// Sweep expired entries every `every` until the cache is dropped.
    pub fn spawn_cleanup(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let cache: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match cache.upgrade() {
                    Some(cache) => cache.cleanup(),
                    None => break,
                }
            }
        })
    }
}

#[async_trait]
impl CacheBackend for InMemoryCache {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let live = self
            .entries
            .get(key)
            .and_then(|entry| (!entry.is_expired()).then(|| entry.value.clone()));

        if live.is_none() {
            self.entries.remove_if(key, |_, entry| entry.is_expired());
        }
        Ok(live)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        tracing::trace!(key = key, ttl_secs = ttl.as_secs(), "Storing cache entry in memory");
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_and_get() {
        let cache = InMemoryCache::new();
        cache.set("pricing_NL", "14.24", Duration::from_secs(60)).await.unwrap();

        assert_eq!(cache.get("pricing_NL").await.unwrap(), Some("14.24".to_string()));
        assert_eq!(cache.get("pricing_FR").await.unwrap(), None);
        assert!(cache.contains("pricing_NL"));
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let cache = InMemoryCache::new();
        cache.set("track_1", "\"NEW\"", Duration::from_secs(60)).await.unwrap();
        cache.set("track_1", "\"DELIVERED\"", Duration::from_secs(60)).await.unwrap();

        assert_eq!(cache.get("track_1").await.unwrap().as_deref(), Some("\"DELIVERED\""));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire() {
        let cache = InMemoryCache::new();
        cache.set("shipment_1", "[]", Duration::from_secs(30)).await.unwrap();

        tokio::time::advance(Duration::from_secs(29)).await;
        assert!(cache.get("shipment_1").await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(!cache.contains("shipment_1"));
        assert_eq!(cache.len(), 1);

        assert!(cache.get("shipment_1").await.unwrap().is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_reads_release_memory() {
        let cache = InMemoryCache::new();
        for i in 0..1000 {
            cache.set(&format!("track_{}", i), "\"NEW\"", Duration::from_secs(1)).await.unwrap();
        }

        tokio::time::advance(Duration::from_secs(2)).await;
        for i in 0..1000 {
            assert!(cache.get(&format!("track_{}", i)).await.unwrap().is_none());
        }

        assert_eq!(cache.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_keeps_live_entries() {
        let cache = InMemoryCache::new();
        cache.set("pricing_NL", "14.24", Duration::from_secs(1)).await.unwrap();
        cache.set("pricing_CN", "8.5", Duration::from_secs(60)).await.unwrap();

        tokio::time::advance(Duration::from_secs(2)).await;
        cache.cleanup();

        assert_eq!(cache.len(), 1);
        assert!(cache.contains("pricing_CN"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_sweep_removes_unread_entries() {
        let cache = Arc::new(InMemoryCache::new());
        let sweeper = cache.spawn_cleanup(Duration::from_secs(10));
        cache.set("shipment_1", "[]", Duration::from_secs(1)).await.unwrap();

        tokio::time::sleep(Duration::from_secs(11)).await;
        assert!(cache.is_empty());

        drop(cache);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(sweeper.is_finished());
    }
}
