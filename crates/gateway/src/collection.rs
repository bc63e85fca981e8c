//! Per-source batch collection.

use futures::{stream, StreamExt};
use std::sync::Arc;
use std::time::Instant;

use aggregator_core::{
    traits::SourceClient,
    types::{ResultMap, SourceKind},
};

/// Fans a batch of identifiers out to one source client.
///
/// Unbounded by default: every identifier in the batch is fetched at once.
pub struct CollectionService<V> {
    client: Arc<dyn SourceClient<Value = V>>,
    max_in_flight: Option<usize>,
}

impl<V: Send + 'static> CollectionService<V> {
    pub fn new(client: Arc<dyn SourceClient<Value = V>>) -> Self {
        Self {
            client,
            max_in_flight: None,
        }
    }

    /// Bound concurrent fetches; `None` fetches the whole batch at once.
    pub fn with_max_in_flight(mut self, max_in_flight: Option<usize>) -> Self {
        self.max_in_flight = max_in_flight.filter(|limit| *limit > 0);
        self
    }

    pub fn kind(&self) -> SourceKind {
        self.client.kind()
    }

    /// Fetch every identifier concurrently and keep the `Present` ones.
    ///
    /// Resolves only once every fetch has resolved; the client bounds each
    /// one with its own timeout. Duplicate identifiers are fetched
    /// independently and collapse to a single entry.
    pub async fn collect(&self, ids: &[String]) -> ResultMap<V> {
        let started = Instant::now();
        let limit = self.max_in_flight.unwrap_or(ids.len()).max(1);

        let results: Vec<_> = stream::iter(ids.iter().cloned())
            .map(|id| {
                let client = Arc::clone(&self.client);
                async move {
                    let result = client.fetch(&id).await;
                    (id, result)
                }
            })
            .buffer_unordered(limit)
            .collect()
            .await;

        let resolved: ResultMap<V> = results
            .into_iter()
            .filter_map(|(id, result)| result.into_option().map(|value| (id, value)))
            .collect();

        tracing::debug!(
            source = %self.kind(),
            requested = ids.len(),
            resolved = resolved.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Collection finished"
        );

        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aggregator_core::mocks::StaticSourceClient;
    use aggregator_core::types::TrackStatus;
    use std::time::Duration;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[tokio::test]
    async fn keeps_only_present_entries() {
        let client = Arc::new(
            StaticSourceClient::new(SourceKind::Track)
                .with_value("1", TrackStatus::New)
                .with_value("3", TrackStatus::Delivered),
        );
        let service = CollectionService::new(client.clone());

        let map = service.collect(&ids(&["1", "2", "3"])).await;

        assert_eq!(map.len(), 2);
        assert_eq!(map.get("1"), Some(&TrackStatus::New));
        assert_eq!(map.get("3"), Some(&TrackStatus::Delivered));
        assert!(!map.contains_key("2"));
        assert_eq!(client.call_count(), 3);
    }

    #[tokio::test]
    async fn duplicates_are_fetched_independently() {
        let client = Arc::new(StaticSourceClient::new(SourceKind::Pricing).with_value("NL", 14.24));
        let service = CollectionService::new(client.clone());

        let map = service.collect(&ids(&["NL", "NL"])).await;

        assert_eq!(map.len(), 1);
        assert_eq!(client.calls_for("NL"), 2);
    }

    #[tokio::test]
    async fn empty_batch_makes_no_calls() {
        let client = Arc::new(StaticSourceClient::<f64>::new(SourceKind::Pricing));
        let service = CollectionService::new(client.clone());

        assert!(service.collect(&[]).await.is_empty());
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn max_in_flight_bounds_concurrency() {
        let client = Arc::new(
            StaticSourceClient::<f64>::new(SourceKind::Pricing).with_delay(Duration::from_millis(100)),
        );
        let service = CollectionService::new(client.clone()).with_max_in_flight(Some(4));

        let batch: Vec<String> = (0..10).map(|i| i.to_string()).collect();
        let started = tokio::time::Instant::now();
        service.collect(&batch).await;

        assert_eq!(client.max_in_flight(), 4);
        // 10 calls, 4 at a time: three waves
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(300), "elapsed {:?}", elapsed);
        assert!(elapsed < Duration::from_millis(400), "elapsed {:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn unbounded_by_default() {
        let client = Arc::new(
            StaticSourceClient::<f64>::new(SourceKind::Pricing).with_delay(Duration::from_secs(3)),
        );
        let service = CollectionService::new(client.clone());

        let batch: Vec<String> = (0..300).map(|i| i.to_string()).collect();
        let started = tokio::time::Instant::now();
        service.collect(&batch).await;

        assert_eq!(client.max_in_flight(), 300);
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn collection_runs_on_a_spawned_task() {
        let client = Arc::new(
            StaticSourceClient::new(SourceKind::Track).with_value("1", TrackStatus::Delivering),
        );
        let service = Arc::new(CollectionService::new(client));
        let batch = ids(&["1", "2"]);

        let map = tokio::spawn(async move { service.collect(&batch).await })
            .await
            .unwrap();

        assert_eq!(map.get("1"), Some(&TrackStatus::Delivering));
        assert_eq!(map.len(), 1);
    }
}
