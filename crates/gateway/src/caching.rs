//! Read-through caching decorator for source clients.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;

use aggregator_core::{
    traits::{CacheBackend, SourceClient},
    types::{SourceKind, SourceResult},
};
use aggregator_telemetry::track_cache;

/// Wraps a source client with a read-through cache.
///
/// Only `Present` values are written. An unhealthy backend degrades to a
/// miss on read and a skipped write; it never changes the returned result.
pub struct CachingSourceClient<V> {
    inner: Arc<dyn SourceClient<Value = V>>,
    cache: Arc<dyn CacheBackend>,
    expiration: Duration,
}

impl<V> CachingSourceClient<V>
where
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Create a decorator around `inner`.
    pub fn new(
        inner: Arc<dyn SourceClient<Value = V>>,
        cache: Arc<dyn CacheBackend>,
        expiration: Duration,
    ) -> Self {
        Self {
            inner,
            cache,
            expiration,
        }
    }

    async fn read(&self, kind: SourceKind, key: &str) -> Option<V> {
        let raw = match self.cache.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                tracing::debug!(source = %kind, key = key, "Cache miss");
                track_cache(kind.label(), "miss");
                return None;
            }
            Err(e) => {
                tracing::warn!(
                    source = %kind,
                    backend = self.cache.name(),
                    key = key,
                    error = %e,
                    "Cache read failed, treating as miss"
                );
                track_cache(kind.label(), "error");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => {
                tracing::debug!(source = %kind, key = key, "Cache hit");
                track_cache(kind.label(), "hit");
                Some(value)
            }
            Err(e) => {
                tracing::warn!(source = %kind, key = key, error = %e, "Discarding undecodable cache entry");
                track_cache(kind.label(), "error");
                None
            }
        }
    }

    async fn write(&self, kind: SourceKind, key: &str, value: &V) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(source = %kind, key = key, error = %e, "Cannot serialize value for cache");
                return;
            }
        };

        match self.cache.set(key, &raw, self.expiration).await {
            Ok(()) => {
                tracing::debug!(
                    source = %kind,
                    key = key,
                    ttl_secs = self.expiration.as_secs(),
                    "Added to cache"
                );
            }
            Err(e) => {
                tracing::warn!(
                    source = %kind,
                    backend = self.cache.name(),
                    key = key,
                    error = %e,
                    "Cache write failed"
                );
            }
        }
    }
}

#[async_trait]
impl<V> SourceClient for CachingSourceClient<V>
where
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    type Value = V;

    fn kind(&self) -> SourceKind {
        self.inner.kind()
    }

    async fn fetch(&self, id: &str) -> SourceResult<V> {
        let kind = self.kind();
        let key = kind.cache_key(id);

        if let Some(value) = self.read(kind, &key).await {
            return SourceResult::Present(value);
        }

        match self.inner.fetch(id).await {
            SourceResult::Present(value) => {
                self.write(kind, &key, &value).await;
                SourceResult::Present(value)
            }
            // Never pin a transient failure in the cache
            SourceResult::Absent => SourceResult::Absent,
        }
    }
}
