//! Mock implementations of core traits for testing.
//!
//! These are shared by the unit and integration tests of every crate in the
//! workspace, so they live in the library rather than behind `cfg(test)`.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::{
    traits::{CacheBackend, SourceClient},
    types::{SourceKind, SourceResult},
    Error, Result,
};

// =============================================================================
// Mock Source Client
// =============================================================================

/// Scripted source client.
///
/// Identifiers without a scripted result resolve to `Absent` (not found).
/// Every call sleeps for the configured delay (virtual time under
/// `start_paused`). While `set_failing(true)` is in effect every lookup
/// fails with a transport error instead.
pub struct StaticSourceClient<V> {
    kind: SourceKind,
    results: HashMap<String, V>,
    delay: Duration,
    per_id_delay: HashMap<String, Duration>,
    calls: Mutex<HashMap<String, usize>>,
    failing: AtomicBool,
    completed: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl<V: Clone + Send + Sync + 'static> StaticSourceClient<V> {
    /// Create a client that answers `Absent` for everything.
    pub fn new(kind: SourceKind) -> Self {
        Self {
            kind,
            results: HashMap::new(),
            delay: Duration::ZERO,
            per_id_delay: HashMap::new(),
            calls: Mutex::new(HashMap::new()),
            failing: AtomicBool::new(false),
            completed: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Answer `Present(value)` for `id`.
    pub fn with_value(mut self, id: &str, value: V) -> Self {
        self.results.insert(id.to_string(), value);
        self
    }

    /// Answer `Present` for every `(id, value)` pair.
    pub fn with_values<I>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = (String, V)>,
    {
        for (id, value) in values {
            self.results.insert(id, value);
        }
        self
    }

    /// Delay every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Delay calls for one identifier only.
    pub fn with_delay_for(mut self, id: &str, delay: Duration) -> Self {
        self.per_id_delay.insert(id.to_string(), delay);
        self
    }

    /// Make every following lookup fail, or succeed again.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Total number of calls made.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    /// Number of calls made for one identifier.
    pub fn calls_for(&self, id: &str) -> usize {
        self.calls.lock().unwrap().get(id).copied().unwrap_or(0)
    }

    /// Number of calls that ran to completion (were not dropped).
    pub fn completed_count(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Highest number of calls observed in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl<V: Clone + Send + Sync + 'static> SourceClient for StaticSourceClient<V> {
    type Value = V;

    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn fetch(&self, id: &str) -> SourceResult<V> {
        self.lookup(id).await.ok().into()
    }

    async fn lookup(&self, id: &str) -> Result<V> {
        *self.calls.lock().unwrap().entry(id.to_string()).or_insert(0) += 1;

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        let delay = self.per_id_delay.get(id).copied().unwrap_or(self.delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        self.completed.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::transport("scripted upstream failure"));
        }
        self.results
            .get(id)
            .cloned()
            .ok_or_else(|| Error::not_found(id))
    }
}

// =============================================================================
// Mock Cache Backends
// =============================================================================

/// Cache backend whose every operation fails.
#[derive(Default)]
pub struct FailingCache {
    operations: AtomicUsize,
}

impl FailingCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of operations attempted.
    pub fn operation_count(&self) -> usize {
        self.operations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CacheBackend for FailingCache {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn get(&self, _key: &str) -> Result<Option<String>> {
        self.operations.fetch_add(1, Ordering::SeqCst);
        Err(Error::cache("connection refused"))
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<()> {
        self.operations.fetch_add(1, Ordering::SeqCst);
        Err(Error::cache("connection refused"))
    }
}

/// Cache backend that reads fine but rejects writes.
#[derive(Default)]
pub struct ReadOnlyCache {
    entries: Mutex<HashMap<String, String>>,
    rejected_writes: AtomicUsize,
}

impl ReadOnlyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with preset entries.
    pub fn with_entries(entries: Vec<(&str, &str)>) -> Self {
        let cache = Self::new();
        {
            let mut map = cache.entries.lock().unwrap();
            for (k, v) in entries {
                map.insert(k.to_string(), v.to_string());
            }
        }
        cache
    }

    /// Number of writes that were rejected.
    pub fn rejected_writes(&self) -> usize {
        self.rejected_writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CacheBackend for ReadOnlyCache {
    fn name(&self) -> &'static str {
        "read_only"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<()> {
        self.rejected_writes.fetch_add(1, Ordering::SeqCst);
        Err(Error::cache("READONLY You can't write against a read only replica"))
    }
}

// Behavioural tests for these mocks live with the components that use them.
