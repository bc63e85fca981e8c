#![deny(unused)]
//! Observability for the aggregation gateway.
//!
//! This crate provides:
//! - Structured logging (text or JSON) with optional OTLP export
//! - Prometheus metrics for source fetches, cache lookups and requests

pub mod metrics;
pub mod tracing_layer;

pub use self::metrics::{setup_metrics_recorder, track_aggregation, track_cache, track_fetch};
pub use tracing_layer::configure_tracing;
