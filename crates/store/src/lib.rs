#![deny(unused)]
//! Cache backends for the aggregation gateway.
//!
//! The cache is process-external shared state in production (Redis) and a
//! `DashMap` for single-instance runs and tests. Both are injected into the
//! caching decorator; neither is a global.

pub mod memory;
pub mod redis;

pub use memory::InMemoryCache;
pub use self::redis::RedisCache;
