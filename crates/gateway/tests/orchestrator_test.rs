use aggregator_core::config::AppConfig;
use aggregator_core::mocks::StaticSourceClient;
use aggregator_core::types::{AggregationRequest, Price, Product, Shipment, SourceKind, TrackStatus};
use aggregator_gateway::{AggregationOrchestrator, CachingSourceClient, CollectionService};
use aggregator_store::InMemoryCache;
use std::sync::Arc;
use std::time::Duration;

const DEADLINE: Duration = Duration::from_millis(4800);

struct Fixture {
    shipments: Arc<StaticSourceClient<Shipment>>,
    track: Arc<StaticSourceClient<TrackStatus>>,
    pricing: Arc<StaticSourceClient<Price>>,
}

impl Fixture {
    fn new() -> Self {
        Self {
            shipments: Arc::new(
                StaticSourceClient::new(SourceKind::Shipments)
                    .with_value("1", vec![Product::Box, Product::Envelope])
                    .with_value("2", vec![]),
            ),
            track: Arc::new(
                StaticSourceClient::new(SourceKind::Track)
                    .with_value("1", TrackStatus::InTransit)
                    .with_value("2", TrackStatus::Delivered),
            ),
            pricing: Arc::new(
                StaticSourceClient::new(SourceKind::Pricing)
                    .with_value("NL", 14.24)
                    .with_value("FR", 9.5),
            ),
        }
    }

    fn orchestrator(&self, deadline: Duration) -> AggregationOrchestrator {
        AggregationOrchestrator::new(
            CollectionService::new(self.shipments.clone()),
            CollectionService::new(self.track.clone()),
            CollectionService::new(self.pricing.clone()),
            deadline,
        )
    }

    fn total_calls(&self) -> usize {
        self.shipments.call_count() + self.track.call_count() + self.pricing.call_count()
    }
}

#[tokio::test]
async fn empty_request_contacts_no_source() {
    let fixture = Fixture::new();
    let orchestrator = fixture.orchestrator(DEADLINE);

    let aggregation = orchestrator.aggregate(AggregationRequest::default()).await;

    assert!(aggregation.is_empty());
    assert_eq!(fixture.total_calls(), 0);
}

#[tokio::test]
async fn merges_all_requested_sources() {
    let fixture = Fixture::new();
    let orchestrator = fixture.orchestrator(DEADLINE);

    let request = AggregationRequest::default()
        .with_shipments(vec!["1", "2", "3"])
        .with_track(vec!["1", "2"])
        .with_pricing(vec!["NL", "FR"]);
    let aggregation = orchestrator.aggregate(request).await;

    assert_eq!(aggregation.shipments.len(), 2);
    assert_eq!(
        aggregation.shipments.get("1"),
        Some(&vec![Product::Box, Product::Envelope])
    );
    assert_eq!(aggregation.shipments.get("2"), Some(&vec![]));
    assert!(!aggregation.shipments.contains_key("3"));
    assert_eq!(aggregation.track.get("2"), Some(&TrackStatus::Delivered));
    assert_eq!(aggregation.pricing.get("NL"), Some(&14.24));
    assert_eq!(aggregation.len(), 6);
}

#[tokio::test]
async fn skipped_sources_are_never_contacted() {
    let fixture = Fixture::new();
    let orchestrator = fixture.orchestrator(DEADLINE);

    let request = AggregationRequest::default().with_pricing(vec!["AD", "FR"]);
    let aggregation = orchestrator.aggregate(request).await;

    assert!(aggregation.shipments.is_empty());
    assert!(aggregation.track.is_empty());
    assert_eq!(aggregation.pricing.len(), 1);
    assert_eq!(aggregation.pricing.get("FR"), Some(&9.5));
    assert!(!aggregation.pricing.contains_key("AD"));

    assert_eq!(fixture.shipments.call_count(), 0);
    assert_eq!(fixture.track.call_count(), 0);
    assert_eq!(fixture.pricing.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn deadline_exceeded_discards_every_source() {
    let fixture = Fixture {
        pricing: Arc::new(
            StaticSourceClient::new(SourceKind::Pricing)
                .with_value("NL", 14.24)
                .with_delay_for("NL", Duration::from_secs(10)),
        ),
        ..Fixture::new()
    };
    let orchestrator = fixture.orchestrator(Duration::from_millis(500));

    let request = AggregationRequest::default()
        .with_shipments(vec!["1"])
        .with_track(vec!["1"])
        .with_pricing(vec!["NL"]);

    let started = tokio::time::Instant::now();
    let aggregation = orchestrator.aggregate(request).await;
    let elapsed = started.elapsed();

    assert!(aggregation.is_empty(), "partial result leaked: {:?}", aggregation);
    assert!(elapsed >= Duration::from_millis(500), "elapsed {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(1), "elapsed {:?}", elapsed);

    // The fast sources had finished; the slow one must have been abandoned
    assert_eq!(fixture.shipments.completed_count(), 1);
    tokio::time::sleep(Duration::from_secs(20)).await;
    assert_eq!(fixture.pricing.calls_for("NL"), 1);
    assert_eq!(fixture.pricing.completed_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn batch_is_fetched_concurrently() {
    let delay = Duration::from_millis(300);
    let countries: Vec<String> = (0..50).map(|i| format!("C{i:02}")).collect();
    let pricing = Arc::new(
        StaticSourceClient::new(SourceKind::Pricing)
            .with_values(countries.iter().map(|c| (c.clone(), 1.0)))
            .with_delay(delay),
    );
    let fixture = Fixture {
        pricing: pricing.clone(),
        ..Fixture::new()
    };
    let orchestrator = fixture.orchestrator(DEADLINE);

    let started = tokio::time::Instant::now();
    let aggregation = orchestrator
        .aggregate(AggregationRequest::default().with_pricing(countries.clone()))
        .await;
    let elapsed = started.elapsed();

    assert_eq!(aggregation.pricing.len(), 50);
    assert_eq!(pricing.max_in_flight(), 50);
    assert!(elapsed < delay * 2, "fetches ran sequentially: {:?}", elapsed);
}

#[tokio::test(start_paused = true)]
async fn sources_run_concurrently_with_each_other() {
    let delay = Duration::from_millis(400);
    let fixture = Fixture {
        shipments: Arc::new(
            StaticSourceClient::new(SourceKind::Shipments)
                .with_value("1", vec![Product::Pallet])
                .with_delay(delay),
        ),
        track: Arc::new(
            StaticSourceClient::new(SourceKind::Track)
                .with_value("1", TrackStatus::New)
                .with_delay(delay),
        ),
        pricing: Arc::new(
            StaticSourceClient::new(SourceKind::Pricing)
                .with_value("NL", 2.0)
                .with_delay(delay),
        ),
    };
    let orchestrator = fixture.orchestrator(Duration::from_millis(1000));

    let request = AggregationRequest::default()
        .with_shipments(vec!["1"])
        .with_track(vec!["1"])
        .with_pricing(vec!["NL"]);
    let aggregation = orchestrator.aggregate(request).await;

    // 3 x 400ms would blow the 1s deadline if run one after another
    assert_eq!(aggregation.len(), 3);
}

#[tokio::test]
async fn repeated_requests_are_served_from_cache() {
    let cache = Arc::new(InMemoryCache::new());
    let track = Arc::new(StaticSourceClient::new(SourceKind::Track).with_value("7", TrackStatus::Collected));
    let pricing = Arc::new(StaticSourceClient::<Price>::new(SourceKind::Pricing));
    let shipments = Arc::new(StaticSourceClient::<Shipment>::new(SourceKind::Shipments));
    let ttl = Duration::from_secs(60);

    let orchestrator = AggregationOrchestrator::new(
        CollectionService::new(Arc::new(CachingSourceClient::new(shipments, cache.clone(), ttl))),
        CollectionService::new(Arc::new(CachingSourceClient::new(track.clone(), cache.clone(), ttl))),
        CollectionService::new(Arc::new(CachingSourceClient::new(pricing.clone(), cache.clone(), ttl))),
        DEADLINE,
    );

    let request = AggregationRequest::default()
        .with_track(vec!["7"])
        .with_pricing(vec!["XX"]);

    let first = orchestrator.aggregate(request.clone()).await;
    let second = orchestrator.aggregate(request).await;

    assert_eq!(first, second);
    assert_eq!(second.track.get("7"), Some(&TrackStatus::Collected));
    assert_eq!(track.calls_for("7"), 1);
    // Absent pricing is retried, not cached
    assert_eq!(pricing.calls_for("XX"), 2);
    assert_eq!(cache.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn default_config_resolves_large_batches_inside_the_deadline() {
    let config = AppConfig::default();
    let delay = Duration::from_secs(3);
    let ids: Vec<String> = (0..300).map(|i| format!("{:09}", i)).collect();

    let track = Arc::new(
        StaticSourceClient::new(SourceKind::Track)
            .with_values(ids.iter().map(|id| (id.clone(), TrackStatus::Delivering)))
            .with_delay(delay),
    );
    let fixture = Fixture::new();
    let orchestrator = AggregationOrchestrator::new(
        CollectionService::new(fixture.shipments.clone()).with_max_in_flight(config.aggregation.max_in_flight()),
        CollectionService::new(track.clone()).with_max_in_flight(config.aggregation.max_in_flight()),
        CollectionService::new(fixture.pricing.clone()).with_max_in_flight(config.aggregation.max_in_flight()),
        config.aggregation.deadline(),
    );

    let aggregation = orchestrator
        .aggregate(AggregationRequest::default().with_track(ids))
        .await;

    // Any per-source bound below the batch size would need two 3s rounds
    assert_eq!(aggregation.track.len(), 300);
    assert_eq!(track.max_in_flight(), 300);
}
