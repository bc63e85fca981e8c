use serde::{Deserialize, Serialize};

use super::payload::{Price, Shipment, TrackStatus};
use super::source::ResultMap;

/// The merged answer of one aggregation request.
///
/// The three maps are independent; an identifier in one need not appear
/// in another.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Aggregation {
    /// Products by order number.
    pub shipments: ResultMap<Shipment>,
    /// Tracking status by order number.
    pub track: ResultMap<TrackStatus>,
    /// Price by country code.
    pub pricing: ResultMap<Price>,
}

impl Aggregation {
    /// Assemble from the three collected maps.
    pub fn new(
        shipments: ResultMap<Shipment>,
        track: ResultMap<TrackStatus>,
        pricing: ResultMap<Price>,
    ) -> Self {
        Self {
            shipments,
            track,
            pricing,
        }
    }

    /// Whether all three maps are empty.
    pub fn is_empty(&self) -> bool {
        self.shipments.is_empty() && self.track.is_empty() && self.pricing.is_empty()
    }

    /// Total number of resolved identifiers across all sources.
    pub fn len(&self) -> usize {
        self.shipments.len() + self.track.len() + self.pricing.len()
    }
}
