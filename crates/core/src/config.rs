use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::types::SourceKind;

/// Placeholder substituted with the identifier in source paths.
pub const ID_PLACEHOLDER: &str = "{id}";

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub aggregation: AggregationConfig,
    pub sources: SourcesConfig,
    pub cache: CacheConfig,
    pub circuit_breaker: CircuitBreakerConfig,
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub enable_cors: bool,
    pub enable_tracing: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AggregationConfig {
    /// Nominal latency promised to callers.
    pub sla_ms: u64,
    /// Headroom kept for serialization and transport.
    pub safety_margin_ms: u64,
    /// Upper bound on concurrent fetches within one collection; 0 means
    /// unbounded. A bound below the batch size makes fetches run in waves,
    /// and a slow upstream can then push the batch past the deadline.
    pub max_in_flight: usize,
}

impl AggregationConfig {
    pub fn sla(&self) -> Duration {
        Duration::from_millis(self.sla_ms)
    }

    pub fn safety_margin(&self) -> Duration {
        Duration::from_millis(self.safety_margin_ms)
    }

    /// Aggregate deadline: SLA minus the safety margin.
    pub fn deadline(&self) -> Duration {
        self.sla().saturating_sub(self.safety_margin())
    }

    /// Concurrency bound per collection, `None` when unbounded.
    pub fn max_in_flight(&self) -> Option<usize> {
        (self.max_in_flight > 0).then_some(self.max_in_flight)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourcesConfig {
    pub shipments: SourceConfig,
    pub track: SourceConfig,
    pub pricing: SourceConfig,
}

impl SourcesConfig {
    pub fn get(&self, kind: SourceKind) -> &SourceConfig {
        match kind {
            SourceKind::Shipments => &self.shipments,
            SourceKind::Track => &self.track,
            SourceKind::Pricing => &self.pricing,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    pub base_url: String,
    /// Path template containing `{id}`, e.g. `/pricing?q={id}`.
    pub path: String,
    pub timeout_ms: u64,
}

impl SourceConfig {
    pub fn new(base_url: impl Into<String>, path: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            path: path.into(),
            timeout_ms: timeout.as_millis() as u64,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendKind {
    Redis,
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    pub enabled: bool,
    pub backend: CacheBackendKind,
    pub host: String,
    pub port: u16,
    pub expiration_secs: u64,
    pub operation_timeout_ms: u64,
}

impl CacheConfig {
    pub fn expiration(&self) -> Duration {
        Duration::from_secs(self.expiration_secs)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    pub fn redis_url(&self) -> String {
        format!("redis://{}:{}/", self.host, self.port)
    }
}

/// Per-source circuit breaker.
///
/// After `failure_threshold` consecutive failed lookups the source is
/// skipped (every id resolves `Absent` at once) for `open_ms`, then a single
/// trial lookup decides whether it closes again.
#[derive(Debug, Deserialize, Clone)]
pub struct CircuitBreakerConfig {
    pub enabled: bool,
    pub failure_threshold: u32,
    pub open_ms: u64,
}

impl CircuitBreakerConfig {
    pub fn open_duration(&self) -> Duration {
        Duration::from_millis(self.open_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    /// Default filter when `RUST_LOG` is unset.
    pub log_filter: String,
    pub json_logs: bool,
}

impl AppConfig {
    pub fn load() -> std::result::Result<Self, ConfigError> {
        let env = std::env::var("AGGREGATOR_ENV").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name("config/default"))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(File::with_name("config/local").required(false))
            // Map APP__CACHE__ENABLED=true to cache.enabled
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?;

        s.try_deserialize()
    }

    /// Reject settings the gateway cannot honour.
    pub fn validate(&self) -> Result<()> {
        let aggregation = &self.aggregation;
        if aggregation.safety_margin_ms >= aggregation.sla_ms {
            return Err(Error::config(format!(
                "safety margin ({}ms) must be smaller than the SLA ({}ms)",
                aggregation.safety_margin_ms, aggregation.sla_ms
            )));
        }
        for kind in SourceKind::ALL {
            let source = self.sources.get(kind);
            if source.timeout_ms == 0 {
                return Err(Error::config(format!("sources.{}.timeout_ms must be positive", kind)));
            }
            url::Url::parse(&source.base_url).map_err(|e| {
                Error::config(format!("sources.{}.base_url is invalid: {}", kind, e))
            })?;
            if !source.path.contains(ID_PLACEHOLDER) {
                return Err(Error::config(format!(
                    "sources.{}.path must contain {}",
                    kind, ID_PLACEHOLDER
                )));
            }
        }

        if self.cache.enabled && self.cache.expiration_secs == 0 {
            return Err(Error::config("cache.expiration_secs must be positive when the cache is enabled"));
        }

        let breaker = &self.circuit_breaker;
        if breaker.enabled && (breaker.failure_threshold == 0 || breaker.open_ms == 0) {
            return Err(Error::config(
                "circuit_breaker.failure_threshold and circuit_breaker.open_ms must be positive when enabled",
            ));
        }

        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        let upstream = "http://localhost:4000";
        let timeout = Duration::from_millis(4000);
        Self {
            server: ServerConfig {
                host: "0.0.0.0".into(),
                port: 8080,
                enable_cors: true,
                enable_tracing: true,
            },
            aggregation: AggregationConfig {
                sla_ms: 5000,
                safety_margin_ms: 200,
                max_in_flight: 0,
            },
            sources: SourcesConfig {
                shipments: SourceConfig::new(upstream, "/shipment-products?q={id}", timeout),
                track: SourceConfig::new(upstream, "/track-status?q={id}", timeout),
                pricing: SourceConfig::new(upstream, "/pricing?q={id}", timeout),
            },
            cache: CacheConfig {
                enabled: false,
                backend: CacheBackendKind::Redis,
                host: "127.0.0.1".into(),
                port: 6379,
                expiration_secs: 300,
                operation_timeout_ms: 250,
            },
            circuit_breaker: CircuitBreakerConfig {
                enabled: true,
                failure_threshold: 5,
                open_ms: 10_000,
            },
            telemetry: TelemetryConfig {
                log_filter: "info,aggregator=debug".into(),
                json_logs: false,
            },
        }
    }
}
