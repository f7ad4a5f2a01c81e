//! Indicator calculation, forecasting and the rule table that turns them into a
//! recommendation.

pub mod cache;
pub mod forecast;
pub mod indicators;
pub mod rules;

pub use cache::AnalysisCache;
pub use forecast::{compute_forecast, confidence, forecast};
pub use indicators::{compute_indicators, moving_average, rsi};
pub use rules::compute_recommendation;

use crate::domain::recommendation::MarketAnalysis;
use crate::domain::series::PriceSeries;
use crate::error::{ensure_finite, EngineError, Result};

pub const DEFAULT_FORECAST_WINDOW: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EngineParams {
    pub rsi_period: usize,
    /// Number of most recent prices used for the forecast and its confidence.
    pub forecast_window: usize,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            rsi_period: indicators::DEFAULT_RSI_PERIOD,
            forecast_window: DEFAULT_FORECAST_WINDOW,
        }
    }
}

/// Runs the indicators, the forecast and the rule table over `series`.
pub fn analyze(series: &PriceSeries, params: &EngineParams) -> Result<MarketAnalysis> {
    let last_price = series
        .last()
        .ok_or_else(|| EngineError::invalid_input("price series is empty"))?;

    let indicators = indicators::compute_indicators_with_period(series, params.rsi_period)?;
    let outcome = compute_forecast(series.tail(params.forecast_window))?;
    let signal = compute_recommendation(
        &indicators,
        &outcome.forecast,
        last_price,
        indicators.moving_average,
    );

    let predicted_change_pct =
        (outcome.forecast.predicted_value - last_price) / last_price * 100.0;

    ensure_finite("rsi", indicators.rsi)?;
    ensure_finite("moving_average", indicators.moving_average)?;
    ensure_finite("predicted_value", outcome.forecast.predicted_value)?;
    ensure_finite("confidence", outcome.confidence)?;
    ensure_finite("predicted_change_pct", predicted_change_pct)?;

    tracing::debug!(
        len = series.len(),
        rsi = indicators.rsi,
        moving_average = indicators.moving_average,
        predicted = outcome.forecast.predicted_value,
        confidence = outcome.confidence,
        recommendation = %signal.recommendation,
        "market analysis computed"
    );

    Ok(MarketAnalysis {
        last_price,
        indicators,
        forecast: outcome.forecast,
        confidence: outcome.confidence,
        predicted_change_pct,
        signal,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::recommendation::{Recommendation, TrendDirection};

    fn series(prices: Vec<f64>) -> PriceSeries {
        PriceSeries::new(prices).unwrap()
    }

    #[test]
    fn rising_series_with_neutral_rsi_accumulates() {
        // 14 rising closes: one short of an RSI reading, so RSI stays neutral.
        let s = series((1..=14).map(|i| 100.0 + f64::from(i)).collect());
        let analysis = analyze(&s, &EngineParams::default()).unwrap();

        assert_eq!(analysis.indicators.rsi, 50.0);
        assert!(analysis.last_price > analysis.indicators.moving_average);
        assert_eq!(analysis.forecast.trend_direction, TrendDirection::Up);
        assert!(analysis.forecast.predicted_value > analysis.last_price);
        assert_eq!(analysis.signal.recommendation, Recommendation::Accumulate);
        assert!(analysis.predicted_change_pct > 0.0);
    }

    #[test]
    fn oversold_dip_then_bounce_is_strong_buy() {
        // Long decline keeps RSI low while the last few closes lift price above its 7-day mean.
        let mut prices: Vec<f64> = (0..13).map(|i| 200.0 - 10.0 * f64::from(i)).collect();
        prices.extend([80.0, 120.0]);
        let s = series(prices);
        let analysis = analyze(&s, &EngineParams::default()).unwrap();

        assert!(analysis.indicators.rsi < 30.0, "rsi = {}", analysis.indicators.rsi);
        assert!(analysis.last_price > analysis.indicators.moving_average);
        assert_eq!(analysis.signal.recommendation, Recommendation::StrongBuy);
        assert_eq!(analysis.signal.reasons[0], rules::REASON_RSI_OVERSOLD);
        assert_eq!(analysis.signal.reasons[1], rules::REASON_ABOVE_MA);
    }

    #[test]
    fn overbought_rollover_is_strong_sell() {
        let mut prices: Vec<f64> = (0..15).map(|i| 100.0 + 10.0 * f64::from(i)).collect();
        prices.extend([225.0, 220.0]);
        let s = series(prices);
        let analysis = analyze(&s, &EngineParams::default()).unwrap();

        assert!(analysis.indicators.rsi > 70.0, "rsi = {}", analysis.indicators.rsi);
        assert!(analysis.last_price <= analysis.indicators.moving_average);
        assert_eq!(analysis.signal.recommendation, Recommendation::StrongSell);
    }

    #[test]
    fn single_price_is_analyzable() {
        let analysis = analyze(&series(vec![42.0]), &EngineParams::default()).unwrap();
        assert_eq!(analysis.indicators.rsi, 50.0);
        assert_eq!(analysis.forecast.predicted_value, 42.0);
        assert_eq!(analysis.forecast.trend_direction, TrendDirection::Down);
        assert_eq!(analysis.predicted_change_pct, 0.0);
        assert_eq!(analysis.signal.recommendation, Recommendation::Hold);
    }

    #[test]
    fn empty_series_is_invalid_input() {
        assert!(matches!(
            analyze(&PriceSeries::default(), &EngineParams::default()),
            Err(EngineError::InvalidInput { .. })
        ));
    }

    #[test]
    fn overflowing_magnitudes_are_rejected_as_non_finite() {
        let s = series(vec![1e300, 1.5e300, 1.7e308]);
        assert_eq!(
            analyze(&s, &EngineParams::default()),
            Err(EngineError::NonFinite {
                field: "predicted_value"
            })
        );
    }

    #[test]
    fn forecast_window_limits_the_fit() {
        // Only the last two points matter with a window of 2.
        let s = series(vec![500.0, 400.0, 300.0, 100.0, 102.0]);
        let params = EngineParams {
            forecast_window: 2,
            ..EngineParams::default()
        };
        let analysis = analyze(&s, &params).unwrap();
        assert!((analysis.forecast.predicted_value - 104.0).abs() < 1e-9);
        assert_eq!(analysis.forecast.trend_direction, TrendDirection::Up);
    }
}
