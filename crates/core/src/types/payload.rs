use serde::{Deserialize, Serialize};

/// A product packaged in a shipment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Product {
    Envelope,
    Box,
    Pallet,
}

/// Tracking status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackStatus {
    #[serde(rename = "NEW")]
    New,
    #[serde(rename = "IN TRANSIT")]
    InTransit,
    #[serde(rename = "COLLECTING")]
    Collecting,
    #[serde(rename = "COLLECTED")]
    Collected,
    #[serde(rename = "DELIVERING")]
    Delivering,
    #[serde(rename = "DELIVERED")]
    Delivered,
}

/// Shipment products for one order. An empty list is a legitimate answer.
pub type Shipment = Vec<Product>;

/// Price for one country.
pub type Price = f64;
