use crate::domain::recommendation::{
    ForecastResult, IndicatorSnapshot, Recommendation, SignalReport, TrendDirection,
};

pub const RSI_OVERSOLD: f64 = 30.0;
pub const RSI_OVERBOUGHT: f64 = 70.0;

pub const REASON_RSI_OVERSOLD: &str = "RSI is Oversold (Buy Signal)";
pub const REASON_RSI_OVERBOUGHT: &str = "RSI is Overbought (Sell Signal)";
pub const REASON_RSI_NEUTRAL: &str = "RSI is Neutral";
pub const REASON_ABOVE_MA: &str = "Price is above 7-day Moving Average";
pub const REASON_BELOW_MA: &str = "Price is below 7-day Moving Average";
pub const REASON_TREND_UP: &str = "Model predicts upward trend";
pub const REASON_TREND_DOWN: &str = "Model predicts downward trend";

/// Maps indicator values to a recommendation.
///
/// Rules run in a fixed order (RSI, moving average, trend) and each contributes exactly one
/// reason. Only the first two can change the recommendation.
pub fn compute_recommendation(
    snapshot: &IndicatorSnapshot,
    forecast: &ForecastResult,
    last_price: f64,
    moving_average: f64,
) -> SignalReport {
    let (base, rsi_reason) = rsi_rule(snapshot.rsi);
    let (recommendation, ma_reason) = moving_average_rule(base, last_price, moving_average);
    let trend_reason = trend_rule(forecast.trend_direction);

    SignalReport {
        recommendation,
        reasons: [
            rsi_reason.to_string(),
            ma_reason.to_string(),
            trend_reason.to_string(),
        ],
    }
}

fn rsi_rule(rsi: f64) -> (Recommendation, &'static str) {
    if rsi < RSI_OVERSOLD {
        (Recommendation::Buy, REASON_RSI_OVERSOLD)
    } else if rsi > RSI_OVERBOUGHT {
        (Recommendation::Sell, REASON_RSI_OVERBOUGHT)
    } else {
        (Recommendation::Hold, REASON_RSI_NEUTRAL)
    }
}

fn moving_average_rule(
    base: Recommendation,
    last_price: f64,
    moving_average: f64,
) -> (Recommendation, &'static str) {
    if last_price > moving_average {
        let escalated = match base {
            Recommendation::Buy => Recommendation::StrongBuy,
            Recommendation::Hold => Recommendation::Accumulate,
            other => other,
        };
        (escalated, REASON_ABOVE_MA)
    } else {
        let escalated = match base {
            Recommendation::Sell => Recommendation::StrongSell,
            other => other,
        };
        (escalated, REASON_BELOW_MA)
    }
}

fn trend_rule(direction: TrendDirection) -> &'static str {
    match direction {
        TrendDirection::Up => REASON_TREND_UP,
        TrendDirection::Down => REASON_TREND_DOWN,
    }
}
