#![deny(unused)]
//! Aggregation Gateway
//!
//! Answers `GET /aggregation` by fanning out to the shipment-products,
//! track-status and pricing upstreams concurrently, under a single SLA.

use std::sync::Arc;

use aggregator_core::config::{AppConfig, CacheBackendKind, CacheConfig};
use aggregator_core::traits::CacheBackend;
use aggregator_gateway::{AggregatorBuilder, GatewayConfig, GatewayServer};
use aggregator_store::{InMemoryCache, RedisCache};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Tracing is configured from the loaded settings, so report load
    // failures only once it is up.
    let (config, load_error) = match AppConfig::load() {
        Ok(config) => (config, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };

    aggregator_telemetry::configure_tracing(&config.telemetry)?;

    tracing::info!("Starting Aggregation Gateway v{}", env!("CARGO_PKG_VERSION"));
    if let Some(e) = load_error {
        tracing::warn!(error = %e, "Failed to load configuration, using defaults");
    }
    config.validate()?;

    let metrics_handle = aggregator_telemetry::setup_metrics_recorder()?;

    // =========================================================================
    // Cache
    // =========================================================================
    let cache = connect_cache(&config.cache).await;

    // =========================================================================
    // Aggregation engine
    // =========================================================================
    let mut builder = AggregatorBuilder::new(config.clone());
    if let Some(cache) = cache {
        builder = builder.with_cache(cache);
    }
    let orchestrator = Arc::new(builder.build()?);

    for kind in aggregator_core::types::SourceKind::ALL {
        let source = config.sources.get(kind);
        tracing::info!(
            source = %kind,
            base_url = %source.base_url,
            path = %source.path,
            timeout_ms = source.timeout_ms,
            "Upstream configured"
        );
    }

    // =========================================================================
    // HTTP boundary
    // =========================================================================
    let server = GatewayServer::new(GatewayConfig::from(&config.server), orchestrator)
        .with_metrics(metrics_handle);

    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        sla_ms = config.aggregation.sla_ms,
        "Aggregation Gateway ready"
    );

    server.run(shutdown_signal()).await?;

    Ok(())
}

/// Build the configured cache backend, or `None` when caching is off.
///
/// An unreachable Redis disables caching rather than failing startup.
async fn connect_cache(config: &CacheConfig) -> Option<Arc<dyn CacheBackend>> {
    if !config.enabled {
        tracing::info!("Response cache disabled");
        return None;
    }

    match config.backend {
        CacheBackendKind::Memory => {
            tracing::info!(ttl_secs = config.expiration_secs, "Initializing in-memory response cache");
            let cache = Arc::new(InMemoryCache::new());
            cache.spawn_cleanup(config.expiration());
            Some(cache as Arc<dyn CacheBackend>)
        }
        CacheBackendKind::Redis => {
            let url = config.redis_url();
            match RedisCache::connect(&url, config.operation_timeout()).await {
                Ok(cache) => {
                    tracing::info!(url = %url, ttl_secs = config.expiration_secs, "Connected to Redis response cache");
                    Some(Arc::new(cache))
                }
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "Redis unavailable, continuing without cache");
                    None
                }
            }
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
}
