//! HTTP client for one upstream source with timeout-and-fallback.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::time::{Duration, Instant};
use url::Url;

use aggregator_core::{
    config::{SourceConfig, ID_PLACEHOLDER},
    traits::SourceClient,
    types::{Price, Shipment, SourceKind, SourceResult, TrackStatus},
    Error, Result,
};
use aggregator_telemetry::track_fetch;

/// Products-by-order client.
pub type ShipmentClient = HttpSourceClient<Shipment>;
/// Status-by-order client.
pub type TrackClient = HttpSourceClient<TrackStatus>;
/// Price-by-country client.
pub type PricingClient = HttpSourceClient<Price>;

/// Issues one GET per identifier and decodes the JSON body as `V`.
///
/// The whole request, body included, is raced against the per-source
/// timeout. Every failure resolves to `Absent` and is logged with its cause.
pub struct HttpSourceClient<V> {
    kind: SourceKind,
    http: reqwest::Client,
    base_url: Url,
    path: String,
    timeout: Duration,
    _payload: PhantomData<fn() -> V>,
}

impl<V: DeserializeOwned + Send + 'static> HttpSourceClient<V> {
    /// Create a client for `kind` sharing the given connection pool.
    pub fn new(kind: SourceKind, http: reqwest::Client, config: &SourceConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            Error::config(format!("Invalid base URL for {}: {}", kind, e))
        })?;

        Ok(Self {
            kind,
            http,
            base_url,
            path: config.path.clone(),
            timeout: config.timeout(),
            _payload: PhantomData,
        })
    }

    /// Per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Resolve the request URL for `id`.
    pub fn url_for(&self, id: &str) -> Result<Url> {
        let encoded: String = url::form_urlencoded::byte_serialize(id.as_bytes())
            .collect::<String>()
            .replace('+', "%20");
        let path = self.path.replace(ID_PLACEHOLDER, &encoded);

        self.base_url
            .join(&path)
            .map_err(|e| Error::config(format!("Cannot build {} URL for {}: {}", self.kind, id, e)))
    }

    async fn request(&self, id: &str) -> Result<V> {
        let url = self.url_for(id)?;

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| Error::transport(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(Error::not_found(id));
        }
        if !status.is_success() {
            return Err(Error::UpstreamStatus {
                status: status.as_u16(),
            });
        }

        response.json::<V>().await.map_err(|e| {
            if e.is_decode() {
                Error::decode(e.to_string())
            } else {
                Error::transport(e.to_string())
            }
        })
    }
}

#[async_trait]
impl<V: DeserializeOwned + Send + 'static> SourceClient for HttpSourceClient<V> {
    type Value = V;

    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn fetch(&self, id: &str) -> SourceResult<V> {
        self.lookup(id).await.ok().into()
    }

    async fn lookup(&self, id: &str) -> Result<V> {
        let started = Instant::now();
        let outcome = match tokio::time::timeout(self.timeout, self.request(id)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(self.timeout)),
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &outcome {
            Ok(_) => {
                tracing::debug!(source = %self.kind, id = id, elapsed_ms, "Upstream lookup succeeded");
                track_fetch(self.kind.label(), "present");
            }
            Err(Error::NotFound(_)) => {
                tracing::debug!(source = %self.kind, id = id, elapsed_ms, "Upstream has no value");
                track_fetch(self.kind.label(), "not_found");
            }
            Err(e) => {
                tracing::warn!(
                    source = %self.kind,
                    id = id,
                    cause = e.cause(),
                    error = %e,
                    elapsed_ms,
                    "Upstream lookup failed, falling back to absent"
                );
                track_fetch(self.kind.label(), e.cause());
            }
        }

        outcome
    }
}
