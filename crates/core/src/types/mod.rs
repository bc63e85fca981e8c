//! Core type definitions for the aggregation gateway.
//!
//! Every value here is request-scoped and immutable once built.

pub mod aggregation;
pub mod payload;
pub mod request;
pub mod source;

pub use aggregation::*;
pub use payload::*;
pub use request::*;
pub use source::*;
