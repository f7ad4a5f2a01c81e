use crate::domain::recommendation::MarketAnalysis;
use crate::domain::series::PriceSeries;
use crate::engine::{analyze, EngineParams};
use crate::error::Result;
use parking_lot::Mutex;
use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};

/// Hash of a price series (bit patterns, in order) and the parameters it was analysed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SeriesKey(u64);

impl SeriesKey {
    pub fn new(series: &PriceSeries, params: &EngineParams) -> Self {
        let mut hasher = DefaultHasher::new();
        params.hash(&mut hasher);
        series.len().hash(&mut hasher);
        for price in series.as_slice() {
            price.to_bits().hash(&mut hasher);
        }
        Self(hasher.finish())
    }
}

#[derive(Debug)]
struct CachedAnalysis {
    prices: Vec<f64>,
    params: EngineParams,
    analysis: MarketAnalysis,
}

#[derive(Debug, Default)]
struct CacheInner {
    entries: HashMap<SeriesKey, CachedAnalysis>,
    // Insertion order, oldest first.
    order: VecDeque<SeriesKey>,
}

/// Memoizes [`analyze`] results keyed by series content.
///
/// Bounded with FIFO eviction; a capacity of 0 disables caching. Failed analyses are never
/// stored.
#[derive(Debug)]
pub struct AnalysisCache {
    capacity: usize,
    inner: Mutex<CacheInner>,
}

impl AnalysisCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(CacheInner::default()),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the analysis and whether it came from the cache.
    pub fn get_or_compute(
        &self,
        series: &PriceSeries,
        params: &EngineParams,
    ) -> Result<(MarketAnalysis, bool)> {
        if self.capacity == 0 {
            return Ok((analyze(series, params)?, false));
        }

        let key = SeriesKey::new(series, params);
        if let Some(hit) = self.lookup(key, series, params) {
            tracing::debug!(?key, "analysis cache hit");
            return Ok((hit, true));
        }

        // Computed outside the lock; a concurrent miss on the same key just recomputes the
        // same pure result.
        let analysis = analyze(series, params)?;
        self.insert(key, series, params, analysis.clone());
        Ok((analysis, false))
    }

    fn lookup(
        &self,
        key: SeriesKey,
        series: &PriceSeries,
        params: &EngineParams,
    ) -> Option<MarketAnalysis> {
        let inner = self.inner.lock();
        let cached = inner.entries.get(&key)?;
        if cached.params != *params || !same_bits(&cached.prices, series.as_slice()) {
            tracing::warn!(?key, "analysis cache key collision; recomputing");
            return None;
        }
        Some(cached.analysis.clone())
    }

    fn insert(
        &self,
        key: SeriesKey,
        series: &PriceSeries,
        params: &EngineParams,
        analysis: MarketAnalysis,
    ) {
        let mut inner = self.inner.lock();
        let entry = CachedAnalysis {
            prices: series.as_slice().to_vec(),
            params: *params,
            analysis,
        };
        if inner.entries.insert(key, entry).is_some() {
            return;
        }
        inner.order.push_back(key);

        while inner.entries.len() > self.capacity {
            let Some(oldest) = inner.order.pop_front() else {
                break;
            };
            inner.entries.remove(&oldest);
        }
    }
}

fn same_bits(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(prices: &[f64]) -> PriceSeries {
        PriceSeries::new(prices.to_vec()).unwrap()
    }

    #[test]
    fn key_depends_on_order_and_params() {
        let params = EngineParams::default();
        let a = SeriesKey::new(&series(&[1.0, 2.0]), &params);
        let b = SeriesKey::new(&series(&[2.0, 1.0]), &params);
        assert_ne!(a, b);
        assert_eq!(a, SeriesKey::new(&series(&[1.0, 2.0]), &params));

        let other = EngineParams {
            rsi_period: 5,
            ..params
        };
        assert_ne!(a, SeriesKey::new(&series(&[1.0, 2.0]), &other));
    }

    #[test]
    fn second_call_hits_and_matches() {
        let cache = AnalysisCache::new(4);
        let params = EngineParams::default();
        let s = series(&[10.0, 11.0, 12.0, 11.5]);

        let (first, cached) = cache.get_or_compute(&s, &params).unwrap();
        assert!(!cached);
        let (second, cached) = cache.get_or_compute(&s, &params).unwrap();
        assert!(cached);
        assert_eq!(first, second);
        assert_eq!(first, analyze(&s, &params).unwrap());
    }

    #[test]
    fn evicts_oldest_beyond_capacity() {
        let cache = AnalysisCache::new(2);
        let params = EngineParams::default();
        let a = series(&[1.0]);
        let b = series(&[2.0]);
        let c = series(&[3.0]);

        cache.get_or_compute(&a, &params).unwrap();
        cache.get_or_compute(&b, &params).unwrap();
        cache.get_or_compute(&c, &params).unwrap();
        assert_eq!(cache.len(), 2);

        let (_, cached) = cache.get_or_compute(&a, &params).unwrap();
        assert!(!cached);
        let (_, cached) = cache.get_or_compute(&c, &params).unwrap();
        assert!(cached);
    }

    #[test]
    fn zero_capacity_disables_and_errors_are_not_cached() {
        let disabled = AnalysisCache::new(0);
        let s = series(&[5.0, 6.0]);
        let params = EngineParams::default();
        disabled.get_or_compute(&s, &params).unwrap();
        let (_, cached) = disabled.get_or_compute(&s, &params).unwrap();
        assert!(!cached);
        assert!(disabled.is_empty());

        let cache = AnalysisCache::new(4);
        assert!(cache
            .get_or_compute(&PriceSeries::default(), &params)
            .is_err());
        assert!(cache.is_empty());
    }
}
