use crate::domain::series::PriceSeries;
use crate::ingest::types::{PricePayload, PricePoint};
use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeMap;

/// Parses a JSON price payload (bare array or `{"prices": [...]}`) into a validated series.
pub fn parse_prices(text: &str, daily: bool) -> Result<PriceSeries> {
    let payload = serde_json::from_str::<PricePayload>(text.trim())
        .context("price payload must be a JSON array or an object with a `prices` array")?;
    series_from_points(payload.into_points(), daily)
}

/// Builds a series from price points.
///
/// Timestamped points are ordered by time; with `daily` they are reduced to the last price of
/// each UTC calendar day. Bare prices are taken in the order given and cannot be reduced.
pub fn series_from_points(points: Vec<PricePoint>, daily: bool) -> Result<PriceSeries> {
    let timestamped = points
        .iter()
        .filter(|p| matches!(p, PricePoint::Timestamped(..)))
        .count();

    let prices: Vec<f64> = if timestamped == 0 {
        if daily && !points.is_empty() {
            bail!("daily reduction needs [timestamp_ms, price] points");
        }
        points
            .into_iter()
            .filter_map(|p| match p {
                PricePoint::Price(price) => Some(price),
                PricePoint::Timestamped(..) => None,
            })
            .collect()
    } else {
        anyhow::ensure!(
            timestamped == points.len(),
            "price points must be all bare prices or all [timestamp_ms, price] pairs"
        );
        let mut pairs = Vec::with_capacity(points.len());
        for point in points {
            if let PricePoint::Timestamped(ts, price) = point {
                pairs.push((timestamp_ms(ts)?, price));
            }
        }
        // Stable, so equal timestamps keep their payload order.
        pairs.sort_by_key(|(ts, _)| *ts);

        if daily {
            daily_closes(&pairs)?
        } else {
            pairs.into_iter().map(|(_, price)| price).collect()
        }
    };

    Ok(PriceSeries::new(prices)?)
}

// Upper bound keeps the value exactly representable as both f64 and i64.
const MAX_TIMESTAMP_MS: f64 = 9_007_199_254_740_992.0;

fn timestamp_ms(ts: f64) -> Result<i64> {
    anyhow::ensure!(
        ts.is_finite() && ts.fract() == 0.0 && ts.abs() <= MAX_TIMESTAMP_MS,
        "timestamp must be a whole number of milliseconds (got {ts})"
    );
    Ok(ts as i64)
}

fn daily_closes(pairs: &[(i64, f64)]) -> Result<Vec<f64>> {
    let mut by_day = BTreeMap::<NaiveDate, f64>::new();
    for &(ts, price) in pairs {
        let day = DateTime::<Utc>::from_timestamp_millis(ts)
            .with_context(|| format!("timestamp out of range: {ts}"))?
            .date_naive();
        by_day.insert(day, price);
    }

    tracing::debug!(
        points = pairs.len(),
        days = by_day.len(),
        "reduced price points to daily closes"
    );
    Ok(by_day.into_values().collect())
}
