use crate::error::{EngineError, Result};
use serde::Serialize;

/// Closing prices at a fixed interval, oldest first.
///
/// Every element is finite and strictly positive. Empty series are allowed; the engine
/// functions that cannot work on an empty window report `InvalidInput` themselves.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PriceSeries(Vec<f64>);

impl PriceSeries {
    pub fn new(prices: Vec<f64>) -> Result<Self> {
        for (idx, price) in prices.iter().enumerate() {
            if !price.is_finite() {
                return Err(EngineError::invalid_input(format!(
                    "price at index {idx} is not finite"
                )));
            }
            if *price <= 0.0 {
                return Err(EngineError::invalid_input(format!(
                    "price at index {idx} must be positive (got {price})"
                )));
            }
        }
        Ok(Self(prices))
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<f64> {
        self.0.last().copied()
    }

    /// The most recent `n` prices (all of them when fewer are available).
    pub fn tail(&self, n: usize) -> &[f64] {
        tail(&self.0, n)
    }

    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }
}

impl TryFrom<Vec<f64>> for PriceSeries {
    type Error = EngineError;

    fn try_from(prices: Vec<f64>) -> Result<Self> {
        Self::new(prices)
    }
}

impl AsRef<[f64]> for PriceSeries {
    fn as_ref(&self) -> &[f64] {
        &self.0
    }
}

pub(crate) fn tail(prices: &[f64], n: usize) -> &[f64] {
    &prices[prices.len().saturating_sub(n)..]
}
