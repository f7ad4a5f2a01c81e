//! Momentum and trend indicators over a closing-price series.

use crate::domain::recommendation::IndicatorSnapshot;
use crate::domain::series::{tail, PriceSeries};
use crate::error::{EngineError, Result};

pub const DEFAULT_RSI_PERIOD: usize = 14;

/// Window of the moving average the signal rules compare the last price against.
pub const MA_WINDOW: usize = 7;

const NEUTRAL_RSI: f64 = 50.0;

/// Relative Strength Index over the last `period` price changes.
///
/// Returns the neutral 50 when fewer than `period + 1` prices are available (or `period` is 0)
/// and 100 when the window has no losses.
pub fn rsi(prices: &[f64], period: usize) -> f64 {
    if period == 0 || prices.len() <= period {
        return NEUTRAL_RSI;
    }

    let window = tail(prices, period + 1);
    let (gains, losses) = window
        .windows(2)
        .map(|pair| pair[1] - pair[0])
        .fold((0.0_f64, 0.0_f64), |(gains, losses), change| {
            if change > 0.0 {
                (gains + change, losses)
            } else if change < 0.0 {
                (gains, losses - change)
            } else {
                (gains, losses)
            }
        });

    let avg_gain = gains / period as f64;
    let avg_loss = losses / period as f64;

    if avg_loss == 0.0 {
        return 100.0;
    }

    100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
}

/// Arithmetic mean of the last `window` prices (all of them when fewer are available).
pub fn moving_average(prices: &[f64], window: usize) -> Result<f64> {
    let recent = tail(prices, window);
    if recent.is_empty() {
        return Err(EngineError::invalid_input(
            "moving average needs at least one price",
        ));
    }
    Ok(recent.iter().sum::<f64>() / recent.len() as f64)
}

pub fn compute_indicators(series: &PriceSeries) -> Result<IndicatorSnapshot> {
    compute_indicators_with_period(series, DEFAULT_RSI_PERIOD)
}

pub fn compute_indicators_with_period(
    series: &PriceSeries,
    rsi_period: usize,
) -> Result<IndicatorSnapshot> {
    let prices = series.as_slice();
    let moving_average = moving_average(prices, MA_WINDOW)?;

    if prices.len() <= rsi_period {
        tracing::debug!(
            len = prices.len(),
            rsi_period,
            "insufficient history for RSI; using neutral value"
        );
    }

    Ok(IndicatorSnapshot {
        rsi: rsi(prices, rsi_period),
        moving_average,
    })
}
