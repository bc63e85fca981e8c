#![deny(unused)]
//! Aggregation engine and HTTP boundary for the gateway.
//!
//! Data flows top-down on each request:
//! orchestrator -> collection services -> (caching) -> (circuit breaker) ->
//! source clients -> upstream.
//! Results are unioned on the way back up.

pub mod breaker;
pub mod builder;
pub mod caching;
pub mod client;
pub mod collection;
pub mod orchestrator;
pub mod server;

pub use breaker::{CircuitBreakerSourceClient, CircuitState};
pub use builder::{default_http_client, AggregatorBuilder};
pub use caching::CachingSourceClient;
pub use client::{HttpSourceClient, PricingClient, ShipmentClient, TrackClient};
pub use collection::CollectionService;
pub use orchestrator::AggregationOrchestrator;
pub use server::{parse_aggregation_query, GatewayConfig, GatewayServer};
