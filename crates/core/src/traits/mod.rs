//! Core traits for the aggregation gateway.
//!
//! - `source`: upstream lookups (SourceClient)
//! - `cache`: shared key-value cache (CacheBackend)

pub mod cache;
pub mod source;

pub use cache::*;
pub use source::*;
