use serde::{Deserialize, Serialize};

/// One entry of a price payload: a bare close, or a `[timestamp_ms, price]` pair as returned by
/// market-chart style endpoints. Timestamps may be JSON integers or floats.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PricePoint {
    Price(f64),
    Timestamped(f64, f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PricePayload {
    Plain(Vec<PricePoint>),
    Chart { prices: Vec<PricePoint> },
}

impl PricePayload {
    pub fn into_points(self) -> Vec<PricePoint> {
        match self {
            PricePayload::Plain(points) => points,
            PricePayload::Chart { prices } => prices,
        }
    }
}
