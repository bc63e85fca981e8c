#![deny(unused)]
//! Core types, traits, and error definitions for the aggregation gateway.
//!
//! This crate provides the building blocks shared by the cache backends,
//! the orchestration engine and the HTTP boundary.

pub mod config;
pub mod error;
pub mod mocks;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use traits::{CacheBackend, SourceClient};
pub use types::{
    Aggregation, AggregationRequest, IdBatch, Price, Product, ResultMap, Shipment, SourceKind,
    SourceResult, TrackStatus,
};
