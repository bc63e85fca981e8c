//! Redis implementation of CacheBackend.

use async_trait::async_trait;
use redis::{aio::MultiplexedConnection, AsyncCommands, Client};
use std::future::Future;
use std::time::Duration;

use aggregator_core::{traits::CacheBackend, Error, Result};

/// Redis-backed cache shared by every source kind.
///
/// Holds one multiplexed connection opened by [`RedisCache::connect`];
/// dropping the cache closes it.
pub struct RedisCache {
    connection: MultiplexedConnection,
    operation_timeout: Duration,
}

impl RedisCache {
    /// Open a connection to `url`, failing if the server is unreachable
    /// within `operation_timeout`.
    pub async fn connect(url: &str, operation_timeout: Duration) -> Result<Self> {
        let client = Client::open(url)
            .map_err(|e| Error::cache(format!("Invalid Redis URL {}: {}", url, e)))?;

        let connection = tokio::time::timeout(
            operation_timeout,
            client.get_multiplexed_async_connection(),
        )
        .await
        .map_err(|_| Error::cache(format!("Timed out connecting to Redis at {}", url)))?
        .map_err(|e| Error::cache(format!("Failed to connect to Redis: {}", e)))?;

        tracing::info!(url = %url, "Connected to Redis cache");

        Ok(Self {
            connection,
            operation_timeout,
        })
    }

    async fn bounded<T, F>(&self, op: &str, fut: F) -> Result<T>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        tokio::time::timeout(self.operation_timeout, fut)
            .await
            .map_err(|_| Error::cache(format!("Redis {} timed out after {:?}", op, self.operation_timeout)))?
            .map_err(|e| Error::cache(format!("Redis {} error: {}", op, e)))
    }
}

/// Redis `EX` takes whole seconds and rejects zero.
fn expiry_seconds(ttl: Duration) -> u64 {
    let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    secs.max(1)
}

#[async_trait]
impl CacheBackend for RedisCache {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.connection.clone();
        self.bounded("get", conn.get::<_, Option<String>>(key)).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.connection.clone();
        self.bounded("set", conn.set_ex::<_, _, ()>(key, value, expiry_seconds(ttl)))
            .await
    }
}
