//! Circuit breaker decorator for source clients.

use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

use aggregator_core::{
    config::CircuitBreakerConfig,
    traits::SourceClient,
    types::{SourceKind, SourceResult},
    Error, Result,
};
use aggregator_telemetry::track_fetch;

/// Observable breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Lookups go upstream.
    Closed,
    /// Lookups resolve `Absent` without contacting the upstream.
    Open,
    /// One trial lookup is in flight; everything else is rejected.
    HalfOpen,
}

#[derive(Debug)]
enum BreakerState {
    Closed { failures: u32 },
    Open { until: Instant },
    HalfOpen,
}

struct Breaker {
    kind: SourceKind,
    failure_threshold: u32,
    open_for: Duration,
    state: Mutex<BreakerState>,
}

impl Breaker {
    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn state(&self) -> CircuitState {
        match *self.lock() {
            BreakerState::Closed { .. } => CircuitState::Closed,
            BreakerState::Open { .. } => CircuitState::Open,
            BreakerState::HalfOpen => CircuitState::HalfOpen,
        }
    }

    fn try_acquire(&self) -> Option<Permit<'_>> {
        let mut state = self.lock();
        match *state {
            BreakerState::Closed { .. } => Some(Permit::new(self, false)),
            BreakerState::Open { until } if Instant::now() >= until => {
                *state = BreakerState::HalfOpen;
                tracing::debug!(source = %self.kind, "Circuit half-open, sending trial lookup");
                Some(Permit::new(self, true))
            }
            BreakerState::Open { .. } | BreakerState::HalfOpen => None,
        }
    }

    fn open(&self, state: &mut BreakerState) {
        *state = BreakerState::Open {
            until: Instant::now() + self.open_for,
        };
        tracing::warn!(
            source = %self.kind,
            open_ms = self.open_for.as_millis() as u64,
            "Circuit breaker opened"
        );
    }
}

/// Admission for one upstream lookup. A trial permit dropped before it is
/// settled leaves the circuit open but immediately eligible for a new trial.
struct Permit<'a> {
    breaker: &'a Breaker,
    trial: bool,
    settled: bool,
}

impl<'a> Permit<'a> {
    fn new(breaker: &'a Breaker, trial: bool) -> Self {
        Self {
            breaker,
            trial,
            settled: false,
        }
    }

    fn succeed(mut self) {
        self.settled = true;
        let mut state = self.breaker.lock();
        match *state {
            BreakerState::Closed { .. } => *state = BreakerState::Closed { failures: 0 },
            BreakerState::HalfOpen if self.trial => {
                *state = BreakerState::Closed { failures: 0 };
                tracing::info!(source = %self.breaker.kind, "Circuit breaker closed");
            }
            _ => {}
        }
    }

    fn fail(mut self) {
        self.settled = true;
        let mut state = self.breaker.lock();
        match *state {
            BreakerState::Closed { failures } => {
                let failures = failures + 1;
                if failures >= self.breaker.failure_threshold {
                    self.breaker.open(&mut state);
                } else {
                    *state = BreakerState::Closed { failures };
                }
            }
            BreakerState::HalfOpen if self.trial => self.breaker.open(&mut state),
            _ => {}
        }
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if self.trial && !self.settled {
            let mut state = self.breaker.lock();
            if matches!(*state, BreakerState::HalfOpen) {
                *state = BreakerState::Open {
                    until: Instant::now(),
                };
            }
        }
    }
}

/// Stops calling an upstream that keeps failing.
///
/// Consecutive failures (timeouts, transport errors, bad statuses, bad
/// payloads) open the circuit; "not found" counts as a healthy answer.
/// While open, lookups resolve `Absent` at once instead of each waiting
/// out the client timeout.
pub struct CircuitBreakerSourceClient<V> {
    inner: Arc<dyn SourceClient<Value = V>>,
    breaker: Breaker,
}

impl<V: Send + 'static> CircuitBreakerSourceClient<V> {
    /// Wrap `inner`, opening after `failure_threshold` consecutive failures
    /// for `open_for`.
    pub fn new(inner: Arc<dyn SourceClient<Value = V>>, failure_threshold: u32, open_for: Duration) -> Self {
        let kind = inner.kind();
        Self {
            inner,
            breaker: Breaker {
                kind,
                failure_threshold: failure_threshold.max(1),
                open_for,
                state: Mutex::new(BreakerState::Closed { failures: 0 }),
            },
        }
    }

    /// Wrap `inner` using configured thresholds.
    pub fn from_config(inner: Arc<dyn SourceClient<Value = V>>, config: &CircuitBreakerConfig) -> Self {
        Self::new(inner, config.failure_threshold, config.open_duration())
    }

    /// Current breaker state.
    pub fn state(&self) -> CircuitState {
        self.breaker.state()
    }
}

#[async_trait]
impl<V: Send + 'static> SourceClient for CircuitBreakerSourceClient<V> {
    type Value = V;

    fn kind(&self) -> SourceKind {
        self.breaker.kind
    }

    async fn fetch(&self, id: &str) -> SourceResult<V> {
        self.lookup(id).await.ok().into()
    }

    async fn lookup(&self, id: &str) -> Result<V> {
        let kind = self.breaker.kind;
        let Some(permit) = self.breaker.try_acquire() else {
            tracing::debug!(source = %kind, id = id, "Circuit open, skipping upstream");
            track_fetch(kind.label(), "circuit_open");
            return Err(Error::CircuitOpen(kind.to_string()));
        };

        let outcome = self.inner.lookup(id).await;
        match &outcome {
            Err(e) if e.is_upstream_failure() => permit.fail(),
            _ => permit.succeed(),
        }
        outcome
    }
}
