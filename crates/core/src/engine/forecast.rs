//! One-step linear forecast and a volatility-based confidence score.

use crate::domain::recommendation::{ForecastOutcome, ForecastResult, TrendDirection};
use crate::error::{EngineError, Result};

const MIN_CONFIDENCE: f64 = 10.0;
const MAX_CONFIDENCE: f64 = 98.0;

/// Least-squares line through `(i, prices[i])`, evaluated at `x = n`.
///
/// Fewer than two points echo the only price, or 0 when there is none.
pub fn forecast(prices: &[f64]) -> f64 {
    match prices {
        [] => 0.0,
        [only] => *only,
        _ => {
            let n = prices.len() as f64;
            let (sum_x, sum_y, sum_xy, sum_xx) = prices.iter().enumerate().fold(
                (0.0, 0.0, 0.0, 0.0),
                |(sx, sy, sxy, sxx), (i, &y)| {
                    let x = i as f64;
                    (sx + x, sy + y, sxy + x * y, sxx + x * x)
                },
            );

            // x is 0..n-1 with n >= 2, so the denominator is never zero.
            let slope = (n * sum_xy - sum_x * sum_y) / (n * sum_xx - sum_x * sum_x);
            let intercept = (sum_y - slope * sum_x) / n;
            intercept + slope * n
        }
    }
}

pub fn trend_direction(predicted: f64, last_price: f64) -> TrendDirection {
    if predicted > last_price {
        TrendDirection::Up
    } else {
        TrendDirection::Down
    }
}

/// `(1 - (max - min) / max) * 100`, clamped to `10..=98`.
pub fn confidence(recent: &[f64]) -> Result<f64> {
    if recent.is_empty() {
        return Err(EngineError::invalid_input(
            "confidence needs at least one price",
        ));
    }

    let max = recent.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = recent.iter().copied().fold(f64::INFINITY, f64::min);
    if !max.is_finite() || max <= 0.0 {
        return Err(EngineError::invalid_input(format!(
            "confidence needs a positive maximum price (got {max})"
        )));
    }

    let volatility = (max - min) / max;
    Ok(((1.0 - volatility) * 100.0).clamp(MIN_CONFIDENCE, MAX_CONFIDENCE))
}

pub fn compute_forecast(recent: &[f64]) -> Result<ForecastOutcome> {
    let confidence = confidence(recent)?;
    let last_price = recent
        .last()
        .copied()
        .ok_or_else(|| EngineError::invalid_input("forecast window is empty"))?;

    if recent.len() < 2 {
        tracing::debug!(len = recent.len(), "degenerate forecast window; echoing last price");
    }

    let predicted_value = forecast(recent);
    Ok(ForecastOutcome {
        forecast: ForecastResult {
            predicted_value,
            trend_direction: trend_direction(predicted_value, last_price),
        },
        confidence,
    })
}
