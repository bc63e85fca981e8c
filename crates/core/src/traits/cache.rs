//! Cache backend traits.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// Key-value store with per-entry expiration, shared by all source kinds.
///
/// Values are JSON text. Errors are reported, never hidden: callers decide
/// whether an unhealthy cache degrades to a miss.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &'static str;

    /// Read a value. `Ok(None)` is a miss.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value that expires after `ttl`.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;
}
