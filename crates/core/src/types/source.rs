use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// =============================================================================
// Source Kinds
// =============================================================================

/// The three independent upstream data sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Products contained in a shipment, keyed by order number.
    Shipments,
    /// Tracking status, keyed by order number.
    Track,
    /// Price, keyed by ISO country code.
    Pricing,
}

impl SourceKind {
    /// All source kinds, in response order.
    pub const ALL: [SourceKind; 3] = [SourceKind::Shipments, SourceKind::Track, SourceKind::Pricing];

    /// Stable label used in logs and metrics.
    pub fn label(self) -> &'static str {
        match self {
            SourceKind::Shipments => "shipments",
            SourceKind::Track => "track",
            SourceKind::Pricing => "pricing",
        }
    }

    /// Prefix that disambiguates this kind's entries in the shared cache.
    pub fn cache_prefix(self) -> &'static str {
        match self {
            SourceKind::Shipments => "shipment_",
            SourceKind::Track => "track_",
            SourceKind::Pricing => "pricing_",
        }
    }

    /// Cache key for an identifier of this kind.
    pub fn cache_key(self, id: &str) -> String {
        format!("{}{}", self.cache_prefix(), id)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// Lookup Results
// =============================================================================

/// Outcome of a single-identifier lookup.
///
/// `Absent` covers timeouts, transport errors, non-success statuses and
/// "not found" alike. Callers cannot tell these apart.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceResult<V> {
    /// The source returned a usable value.
    Present(V),
    /// No usable value for this identifier.
    Absent,
}

impl<V> SourceResult<V> {
    /// Whether a value is present.
    pub fn is_present(&self) -> bool {
        matches!(self, SourceResult::Present(_))
    }

    /// Convert into an `Option`.
    pub fn into_option(self) -> Option<V> {
        match self {
            SourceResult::Present(v) => Some(v),
            SourceResult::Absent => None,
        }
    }

    /// Map the present value.
    pub fn map<U, F: FnOnce(V) -> U>(self, f: F) -> SourceResult<U> {
        match self {
            SourceResult::Present(v) => SourceResult::Present(f(v)),
            SourceResult::Absent => SourceResult::Absent,
        }
    }
}

impl<V> From<Option<V>> for SourceResult<V> {
    fn from(value: Option<V>) -> Self {
        match value {
            Some(v) => SourceResult::Present(v),
            None => SourceResult::Absent,
        }
    }
}

/// Identifier to value mapping holding only `Present` lookups.
pub type ResultMap<V> = HashMap<String, V>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_keys_are_prefixed_per_kind() {
        assert_eq!(SourceKind::Shipments.cache_key("109347263"), "shipment_109347263");
        assert_eq!(SourceKind::Track.cache_key("1"), "track_1");
        assert_eq!(SourceKind::Pricing.cache_key("NL"), "pricing_NL");
    }

    #[test]
    fn source_result_option_conversions() {
        let present: SourceResult<u8> = Some(3).into();
        assert!(present.is_present());
        assert_eq!(present.map(|v| v * 2).into_option(), Some(6));

        let absent: SourceResult<u8> = None.into();
        assert!(!absent.is_present());
        assert_eq!(absent.into_option(), None);
    }
}
