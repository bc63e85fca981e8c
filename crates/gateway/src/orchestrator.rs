//! Aggregation orchestrator: concurrent fan-out under one deadline.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use aggregator_core::types::{
    Aggregation, AggregationRequest, IdBatch, Price, ResultMap, Shipment, TrackStatus,
};
use aggregator_telemetry::track_aggregation;

use crate::collection::CollectionService;

/// Runs the three collection services concurrently and merges their maps.
///
/// Each request ends in one of two states: every requested collection
/// finished before the deadline and the merged result is returned, or the
/// deadline elapsed and an all-empty result is returned. Partial results
/// are never delivered.
pub struct AggregationOrchestrator {
    shipments: Arc<CollectionService<Shipment>>,
    track: Arc<CollectionService<TrackStatus>>,
    pricing: Arc<CollectionService<Price>>,
    deadline: Duration,
}

impl AggregationOrchestrator {
    /// Create an orchestrator bounded by `deadline` (SLA minus safety margin).
    pub fn new(
        shipments: CollectionService<Shipment>,
        track: CollectionService<TrackStatus>,
        pricing: CollectionService<Price>,
        deadline: Duration,
    ) -> Self {
        Self {
            shipments: Arc::new(shipments),
            track: Arc::new(track),
            pricing: Arc::new(pricing),
            deadline,
        }
    }

    /// The aggregate deadline.
    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Aggregate the three optional batches. Never fails.
    pub async fn aggregate(&self, request: AggregationRequest) -> Aggregation {
        let started = Instant::now();

        if request.is_empty() {
            tracing::debug!("No identifiers requested, skipping all sources");
            track_aggregation("empty", started.elapsed());
            return Aggregation::default();
        }

        tracing::debug!(
            shipments = request.shipments.len(),
            track = request.track.len(),
            pricing = request.pricing.len(),
            deadline_ms = self.deadline.as_millis() as u64,
            "Processing aggregation request"
        );

        let cancel = CancellationToken::new();
        // Abandon in-flight work if this future is dropped by its caller
        let _abandon_on_drop = cancel.clone().drop_guard();

        let all = async {
            tokio::join!(
                run_collection(&self.shipments, request.shipments, cancel.child_token()),
                run_collection(&self.track, request.track, cancel.child_token()),
                run_collection(&self.pricing, request.pricing, cancel.child_token()),
            )
        };

        match tokio::time::timeout(self.deadline, all).await {
            Ok((shipments, track, pricing)) => {
                let aggregation = Aggregation::new(shipments, track, pricing);
                tracing::debug!(
                    resolved = aggregation.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Aggregation finished"
                );
                track_aggregation("completed", started.elapsed());
                aggregation
            }
            Err(_) => {
                cancel.cancel();
                tracing::warn!(
                    deadline_ms = self.deadline.as_millis() as u64,
                    "Aggregation deadline exceeded, discarding results"
                );
                track_aggregation("deadline_exceeded", started.elapsed());
                Aggregation::default()
            }
        }
    }
}

/// Run one collection on its own task, or resolve empty when skipped.
async fn run_collection<V: Send + 'static>(
    service: &Arc<CollectionService<V>>,
    batch: IdBatch,
    cancel: CancellationToken,
) -> ResultMap<V> {
    let ids = match batch {
        IdBatch::Skip => return ResultMap::new(),
        IdBatch::Ids(ids) => ids,
    };

    let service = Arc::clone(service);
    let kind = service.kind();
    let task = tokio::spawn(async move {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(source = %kind, "Collection abandoned");
                ResultMap::new()
            }
            map = service.collect(&ids) => map,
        }
    });

    match task.await {
        Ok(map) => map,
        Err(e) => {
            tracing::error!(source = %kind, error = %e, "Collection task failed");
            ResultMap::new()
        }
    }
}
