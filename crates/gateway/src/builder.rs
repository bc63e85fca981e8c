//! Builder wiring source clients, caching and collection services.

use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;

use aggregator_core::{
    config::AppConfig,
    traits::{CacheBackend, SourceClient},
    types::SourceKind,
    Error, Result,
};

use crate::breaker::CircuitBreakerSourceClient;
use crate::caching::CachingSourceClient;
use crate::client::HttpSourceClient;
use crate::collection::CollectionService;
use crate::orchestrator::AggregationOrchestrator;

/// Builder for constructing an [`AggregationOrchestrator`] from configuration.
///
/// Each source gets an HTTP client, guarded by a [`CircuitBreakerSourceClient`]
/// unless the breaker is disabled. When a cache backend is supplied every
/// client is wrapped in a [`CachingSourceClient`] sharing that backend, so
/// cache hits are served even while a circuit is open.
pub struct AggregatorBuilder {
    config: AppConfig,
    cache: Option<Arc<dyn CacheBackend>>,
    http: Option<reqwest::Client>,
}

impl AggregatorBuilder {
    /// Create a new builder for the given configuration.
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            cache: None,
            http: None,
        }
    }

    /// Put a read-through cache in front of every source.
    pub fn with_cache(mut self, cache: Arc<dyn CacheBackend>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Share an existing HTTP connection pool.
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    /// Build the orchestrator.
    pub fn build(self) -> Result<AggregationOrchestrator> {
        self.config.validate()?;

        let http = match &self.http {
            Some(http) => http.clone(),
            None => default_http_client()?,
        };

        let orchestrator = AggregationOrchestrator::new(
            self.collection(SourceKind::Shipments, &http)?,
            self.collection(SourceKind::Track, &http)?,
            self.collection(SourceKind::Pricing, &http)?,
            self.config.aggregation.deadline(),
        );

        tracing::info!(
            deadline_ms = orchestrator.deadline().as_millis() as u64,
            cache = self.cache.as_ref().map(|c| c.name()).unwrap_or("disabled"),
            "Aggregation orchestrator built"
        );

        Ok(orchestrator)
    }

    fn collection<V>(&self, kind: SourceKind, http: &reqwest::Client) -> Result<CollectionService<V>>
    where
        V: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        let mut plain: Arc<dyn SourceClient<Value = V>> = Arc::new(HttpSourceClient::<V>::new(
            kind,
            http.clone(),
            self.config.sources.get(kind),
        )?);

        if self.config.circuit_breaker.enabled {
            plain = Arc::new(CircuitBreakerSourceClient::from_config(
                plain,
                &self.config.circuit_breaker,
            ));
        }

        let client = match &self.cache {
            Some(cache) => Arc::new(CachingSourceClient::new(
                plain,
                cache.clone(),
                self.config.cache.expiration(),
            )) as Arc<dyn SourceClient<Value = V>>,
            None => plain,
        };

        Ok(CollectionService::new(client).with_max_in_flight(self.config.aggregation.max_in_flight()))
    }
}

/// HTTP client shared by all sources.
pub fn default_http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("aggregation-gateway/", env!("CARGO_PKG_VERSION")))
        .pool_idle_timeout(Duration::from_secs(90))
        .build()
        .map_err(|e| Error::gateway(format!("Failed to build HTTP client: {}", e)))
}
