//! Axum-based HTTP server for the gateway.

use axum::{
    extract::{RawQuery, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use aggregator_core::{
    config::ServerConfig,
    types::{Aggregation, AggregationRequest, IdBatch},
    Error, Result,
};

use crate::orchestrator::AggregationOrchestrator;

/// Query parameter carrying shipment order numbers.
pub const SHIPMENTS_PARAM: &str = "shipmentsOrderNumbers";
/// Query parameter carrying tracking order numbers.
pub const TRACK_PARAM: &str = "trackOrderNumbers";
/// Query parameter carrying pricing country codes.
pub const PRICING_PARAM: &str = "pricingCountryCodes";

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to bind to.
    pub port: u16,
    /// Enable CORS.
    pub enable_cors: bool,
    /// Enable request tracing.
    pub enable_tracing: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            enable_cors: true,
            enable_tracing: true,
        }
    }
}

impl From<&ServerConfig> for GatewayConfig {
    fn from(config: &ServerConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            enable_cors: config.enable_cors,
            enable_tracing: config.enable_tracing,
        }
    }
}

/// Shared application state.
pub struct AppState {
    /// Aggregation engine.
    pub orchestrator: Arc<AggregationOrchestrator>,
}

/// Gateway server.
pub struct GatewayServer {
    config: GatewayConfig,
    state: Arc<AppState>,
    metrics_handle: Option<PrometheusHandle>,
}

impl GatewayServer {
    /// Create a new gateway server.
    pub fn new(config: GatewayConfig, orchestrator: Arc<AggregationOrchestrator>) -> Self {
        Self {
            config,
            state: Arc::new(AppState { orchestrator }),
            metrics_handle: None,
        }
    }

    /// Set metrics handle.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }

    /// Build the Axum router.
    pub fn build_router(&self) -> Router {
        let mut router = Router::new()
            .route("/health", get(health_handler))
            .route("/aggregation", get(aggregation_handler))
            .with_state(self.state.clone());

        if let Some(handle) = &self.metrics_handle {
            let handle = handle.clone();
            router = router.route("/metrics", get(move || async move { handle.render() }));
        }

        if self.config.enable_cors {
            router = router.layer(CorsLayer::new().allow_origin(Any).allow_methods(Any));
        }

        if self.config.enable_tracing {
            router = router.layer(TraceLayer::new_for_http());
        }

        router
    }

    /// Run the server until `shutdown` resolves.
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::gateway(format!("Failed to bind {}: {}", addr, e)))?;

        tracing::info!(addr = %addr, "Gateway server starting");

        axum::serve(listener, self.build_router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| Error::gateway(format!("Server error: {}", e)))?;

        tracing::info!("Gateway server stopped");
        Ok(())
    }
}

// =============================================================================
// Request/Response Types
// =============================================================================

/// Parse the aggregation query string.
///
/// Each parameter takes comma-separated values and may be repeated;
/// all occurrences are concatenated. Missing or blank parameters skip
/// their source.
pub fn parse_aggregation_query(raw: Option<&str>) -> AggregationRequest {
    let mut shipments: Vec<String> = Vec::new();
    let mut track: Vec<String> = Vec::new();
    let mut pricing: Vec<String> = Vec::new();

    for (key, value) in url::form_urlencoded::parse(raw.unwrap_or_default().as_bytes()) {
        let target = match &*key {
            SHIPMENTS_PARAM => &mut shipments,
            TRACK_PARAM => &mut track,
            PRICING_PARAM => &mut pricing,
            _ => continue,
        };
        target.push(value.into_owned());
    }

    let batch = |values: Vec<String>| IdBatch::parse_csv(Some(&values.join(",")));
    AggregationRequest {
        shipments: batch(shipments),
        track: batch(track),
        pricing: batch(pricing),
    }
}

/// Health response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status.
    pub status: String,
    /// Version.
    pub version: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check handler.
async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Aggregation handler. Always answers 200.
async fn aggregation_handler(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
) -> Json<Aggregation> {
    let trace_id = Uuid::new_v4().to_string();
    let request = parse_aggregation_query(query.as_deref());

    tracing::info!(
        trace_id = %trace_id,
        shipments = request.shipments.len(),
        track = request.track.len(),
        pricing = request.pricing.len(),
        "Processing aggregation request"
    );

    let aggregation = state.orchestrator.aggregate(request).await;

    tracing::debug!(trace_id = %trace_id, resolved = aggregation.len(), "Aggregation response ready");
    Json(aggregation)
}
