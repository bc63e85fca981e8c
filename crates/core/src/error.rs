//! Error types for the aggregation gateway.

use thiserror::Error;

/// Result type alias using the gateway's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the aggregation gateway.
///
/// None of these ever reach the caller of `aggregate`: upstream and cache
/// failures are folded into `SourceResult::Absent` or a cache miss. They
/// exist so each layer can log and count the precise cause.
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Upstream Errors
    // =========================================================================
    #[error("Upstream request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Upstream returned status {status}")]
    UpstreamStatus { status: u16 },

    #[error("Not found upstream: {0}")]
    NotFound(String),

    #[error("Failed to decode upstream payload: {0}")]
    Decode(String),

    #[error("Circuit breaker open for {0}")]
    CircuitOpen(String),

    // =========================================================================
    // Cache Errors
    // =========================================================================
    #[error("Cache error: {0}")]
    Cache(String),

    // =========================================================================
    // Gateway Errors
    // =========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Gateway error: {0}")]
    Gateway(String),

    // =========================================================================
    // Generic Errors
    // =========================================================================
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a transport error.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a not-found error.
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound(id.into())
    }

    /// Create a decode error.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a cache error.
    pub fn cache(msg: impl Into<String>) -> Self {
        Self::Cache(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a gateway error.
    pub fn gateway(msg: impl Into<String>) -> Self {
        Self::Gateway(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether the upstream misbehaved, as opposed to answering that it
    /// has no value for the identifier.
    pub fn is_upstream_failure(&self) -> bool {
        !matches!(self, Self::NotFound(_))
    }

    /// Short, stable label for the failure cause.
    ///
    /// Used as the `cause` field in logs and as a metric label.
    pub fn cause(&self) -> &'static str {
        match self {
            Self::Timeout(_) => "timeout",
            Self::Transport(_) => "transport",
            Self::UpstreamStatus { .. } => "upstream_status",
            Self::NotFound(_) => "not_found",
            Self::Decode(_) => "decode",
            Self::Cache(_) => "cache",
            Self::Config(_) => "config",
            Self::Gateway(_) => "gateway",
            Self::CircuitOpen(_) => "circuit_open",
            Self::Internal(_) => "internal",
        }
    }
}
