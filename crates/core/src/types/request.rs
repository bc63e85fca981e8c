use serde::{Deserialize, Serialize};

// =============================================================================
// Request Types
// =============================================================================

/// One optional batch of identifiers for a single source kind.
///
/// `Skip` means the source must not be contacted at all. An empty list is
/// normalised to `Skip` on construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "ids", rename_all = "snake_case")]
pub enum IdBatch {
    /// Source not requested.
    #[default]
    Skip,
    /// Identifiers to look up. Never empty.
    Ids(Vec<String>),
}

impl IdBatch {
    /// Build a batch from an optional list.
    pub fn from_optional(ids: Option<Vec<String>>) -> Self {
        match ids {
            Some(ids) if !ids.is_empty() => IdBatch::Ids(ids),
            _ => IdBatch::Skip,
        }
    }

    /// Parse a comma-separated query value such as `"NL, FR,,DE"`.
    ///
    /// Tokens are trimmed and blank tokens dropped.
    pub fn parse_csv(raw: Option<&str>) -> Self {
        let ids = raw.map(|value| {
            value
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        });
        Self::from_optional(ids)
    }

    /// Whether this batch skips its source.
    pub fn is_skip(&self) -> bool {
        matches!(self, IdBatch::Skip)
    }

    /// Number of identifiers in the batch.
    pub fn len(&self) -> usize {
        match self {
            IdBatch::Skip => 0,
            IdBatch::Ids(ids) => ids.len(),
        }
    }

    /// Whether the batch contains no identifiers.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Vec<String>> for IdBatch {
    fn from(ids: Vec<String>) -> Self {
        Self::from_optional(Some(ids))
    }
}

impl From<Vec<&str>> for IdBatch {
    fn from(ids: Vec<&str>) -> Self {
        Self::from_optional(Some(ids.into_iter().map(str::to_string).collect()))
    }
}

/// The three independent batches of one aggregation request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationRequest {
    /// Order numbers for the shipment-products source.
    pub shipments: IdBatch,
    /// Order numbers for the tracking-status source.
    pub track: IdBatch,
    /// Country codes for the pricing source.
    pub pricing: IdBatch,
}

impl AggregationRequest {
    /// Create a request from three optional lists.
    pub fn new(
        shipments: Option<Vec<String>>,
        track: Option<Vec<String>>,
        pricing: Option<Vec<String>>,
    ) -> Self {
        Self {
            shipments: IdBatch::from_optional(shipments),
            track: IdBatch::from_optional(track),
            pricing: IdBatch::from_optional(pricing),
        }
    }

    /// Set the shipments batch.
    pub fn with_shipments(mut self, batch: impl Into<IdBatch>) -> Self {
        self.shipments = batch.into();
        self
    }

    /// Set the track batch.
    pub fn with_track(mut self, batch: impl Into<IdBatch>) -> Self {
        self.track = batch.into();
        self
    }

    /// Set the pricing batch.
    pub fn with_pricing(mut self, batch: impl Into<IdBatch>) -> Self {
        self.pricing = batch.into();
        self
    }

    /// Whether every source is skipped.
    pub fn is_empty(&self) -> bool {
        self.shipments.is_skip() && self.track.is_skip() && self.pricing.is_skip()
    }
}
