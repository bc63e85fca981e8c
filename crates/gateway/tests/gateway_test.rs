use aggregator_core::mocks::StaticSourceClient;
use aggregator_core::types::{Price, Product, Shipment, SourceKind, TrackStatus};
use aggregator_gateway::{AggregationOrchestrator, CollectionService, GatewayConfig, GatewayServer};
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn app() -> Router {
    let shipments = Arc::new(
        StaticSourceClient::<Shipment>::new(SourceKind::Shipments)
            .with_value("109347263", vec![Product::Box, Product::Box, Product::Pallet]),
    );
    let track = Arc::new(
        StaticSourceClient::new(SourceKind::Track).with_value("109347263", TrackStatus::New),
    );
    let pricing = Arc::new(
        StaticSourceClient::<Price>::new(SourceKind::Pricing)
            .with_value("NL", 14.24)
            .with_value("CN", 20.5),
    );

    let orchestrator = AggregationOrchestrator::new(
        CollectionService::new(shipments),
        CollectionService::new(track),
        CollectionService::new(pricing),
        Duration::from_millis(4800),
    );

    GatewayServer::new(GatewayConfig::default(), Arc::new(orchestrator)).build_router()
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_health_endpoint() {
    let (status, body) = get_json(app(), "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_aggregation_endpoint() {
    let (status, body) = get_json(
        app(),
        "/aggregation?shipmentsOrderNumbers=109347263,123456891\
         &trackOrderNumbers=109347263,123456891\
         &pricingCountryCodes=NL,CN,XX",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "shipments": { "109347263": ["box", "box", "pallet"] },
            "track": { "109347263": "NEW" },
            "pricing": { "NL": 14.24, "CN": 20.5 }
        })
    );
}

#[tokio::test]
async fn test_aggregation_without_parameters() {
    let (status, body) = get_json(app(), "/aggregation").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "shipments": {}, "track": {}, "pricing": {} }));
}

#[tokio::test]
async fn test_metrics_route_requires_handle() {
    let response = app()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
