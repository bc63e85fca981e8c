//! Upstream source traits.

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::types::{SourceKind, SourceResult};

/// Single-identifier lookup against one upstream source.
///
/// `fetch` never fails: every error, timeout or "not found" resolves to
/// [`SourceResult::Absent`]. Implementations log the cause themselves.
#[async_trait]
pub trait SourceClient: Send + Sync {
    /// Payload type returned by this source.
    type Value: Send + 'static;

    /// Which source this client talks to.
    fn kind(&self) -> SourceKind;

    /// Look up one identifier.
    async fn fetch(&self, id: &str) -> SourceResult<Self::Value>;

    /// Look up one identifier, keeping the failure cause.
    ///
    /// Health-tracking decorators use this to tell a failing upstream from
    /// one that has no value. Clients that cannot tell the two apart report
    /// every `Absent` as not found.
    async fn lookup(&self, id: &str) -> Result<Self::Value> {
        self.fetch(id)
            .await
            .into_option()
            .ok_or_else(|| Error::not_found(id))
    }
}
