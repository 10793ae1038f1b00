//! Candle series consumed by the replay
mod random;

pub use random::random_walk;

use std::collections::BTreeMap;
use std::sync::Arc;

use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};

use crate::clock::{Clock, DateTime};

/// One OHLCV sample for a fixed time bucket of one asset. Immutable once built.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Candle {
    pub timestamp: DateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub fn new(
        timestamp: impl Into<DateTime>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            timestamp: timestamp.into(),
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Candle where every price is the same, mostly useful for building test series.
    pub fn flat(timestamp: impl Into<DateTime>, price: f64) -> Self {
        Self::new(timestamp, price, price, price, price, 0.0)
    }

    fn is_well_formed(&self) -> bool {
        let prices = [self.open, self.high, self.low, self.close];
        prices.iter().all(|p| p.is_finite() && *p >= 0.0)
            && self.volume.is_finite()
            && self.volume >= 0.0
            && self.low <= self.high
            && self.low <= self.open.min(self.close)
            && self.high >= self.open.max(self.close)
    }
}

#[derive(Debug, Display, Error)]
pub enum SourceError {
    #[display(fmt = "{} has more than one candle at {}", symbol, timestamp)]
    DuplicateTimestamp { symbol: String, timestamp: DateTime },
    #[display(fmt = "{} has a malformed candle at {}", symbol, timestamp)]
    MalformedCandle { symbol: String, timestamp: DateTime },
}

/// Immutable set of per-asset candle series.
///
/// Series are gap-tolerant: an asset does not need a candle at every timestamp known to the
/// source. A [CandleSource] is never mutated after it is built so it can be wrapped in [Arc] and
/// shared between any number of concurrent runs.
#[derive(Debug)]
pub struct CandleSource {
    //BTreeMap so that symbols always iterate in the same order, any randomness consumed per-asset
    //during a run depends on this
    inner: BTreeMap<String, Vec<Candle>>,
    dates: Arc<Vec<DateTime>>,
}

impl CandleSource {
    pub fn get_candle(&self, date: &DateTime, symbol: &str) -> Option<&Candle> {
        let series = self.inner.get(symbol)?;
        series
            .binary_search_by(|candle| candle.timestamp.cmp(date))
            .ok()
            .and_then(|pos| series.get(pos))
    }

    pub fn get_series(&self, symbol: &str) -> Option<&[Candle]> {
        self.inner.get(symbol).map(|series| series.as_slice())
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.inner.keys().map(|symbol| symbol.as_str())
    }

    pub fn series_len(&self, symbol: &str) -> usize {
        self.inner.get(symbol).map_or(0, |series| series.len())
    }

    /// Clock over the union of every series' timestamps.
    pub fn clock(&self) -> Clock {
        Clock::from_shared(Arc::clone(&self.dates))
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct CandleSourceBuilder {
    inner: BTreeMap<String, Vec<Candle>>,
}

impl CandleSourceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_candle(&mut self, symbol: impl Into<String>, candle: Candle) -> &mut Self {
        self.inner.entry(symbol.into()).or_default().push(candle);
        self
    }

    pub fn add_series(
        &mut self,
        symbol: impl Into<String>,
        candles: impl IntoIterator<Item = Candle>,
    ) -> &mut Self {
        self.inner.entry(symbol.into()).or_default().extend(candles);
        self
    }

    /// Candles can be added in any order, each series is sorted here. Two candles for the same
    /// asset and timestamp are rejected rather than silently merged.
    pub fn build(&mut self) -> Result<CandleSource, SourceError> {
        let mut inner = std::mem::take(&mut self.inner);
        let mut dates = Vec::new();
        for (symbol, series) in inner.iter_mut() {
            series.sort_by_key(|candle| candle.timestamp);
            for pair in series.windows(2) {
                if pair[0].timestamp == pair[1].timestamp {
                    return Err(SourceError::DuplicateTimestamp {
                        symbol: symbol.clone(),
                        timestamp: pair[0].timestamp,
                    });
                }
            }
            if let Some(bad) = series.iter().find(|candle| !candle.is_well_formed()) {
                return Err(SourceError::MalformedCandle {
                    symbol: symbol.clone(),
                    timestamp: bad.timestamp,
                });
            }
            dates.extend(series.iter().map(|candle| candle.timestamp));
        }
        dates.sort();
        dates.dedup();
        Ok(CandleSource {
            inner,
            dates: Arc::new(dates),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{Candle, CandleSourceBuilder, SourceError};
    use crate::clock::DateTime;

    #[test]
    fn test_that_source_returns_candle_for_date_and_symbol() {
        let mut builder = CandleSourceBuilder::new();
        builder
            .add_candle("ABC", Candle::flat(102, 105.0))
            .add_candle("ABC", Candle::flat(100, 101.0))
            .add_candle("BCD", Candle::flat(101, 50.0));
        let source = builder.build().unwrap();

        assert_eq!(source.get_candle(&100.into(), "ABC").unwrap().close, 101.0);
        assert_eq!(source.get_candle(&102.into(), "ABC").unwrap().close, 105.0);
        //Gap in ABC series
        assert!(source.get_candle(&101.into(), "ABC").is_none());
        assert!(source.get_candle(&100.into(), "XYZ").is_none());
    }

    #[test]
    fn test_that_clock_covers_union_of_series_dates() {
        let mut builder = CandleSourceBuilder::new();
        builder
            .add_series("ABC", vec![Candle::flat(100, 1.0), Candle::flat(102, 1.0)])
            .add_series("BCD", vec![Candle::flat(101, 1.0), Candle::flat(102, 1.0)]);
        let source = builder.build().unwrap();

        let dates: Vec<DateTime> = source.clock().peek().collect();
        assert_eq!(dates, vec![100.into(), 101.into(), 102.into()]);
        assert_eq!(source.symbols().collect::<Vec<_>>(), vec!["ABC", "BCD"]);
    }

    #[test]
    fn test_that_duplicate_timestamps_are_rejected() {
        let mut builder = CandleSourceBuilder::new();
        builder
            .add_candle("ABC", Candle::flat(100, 1.0))
            .add_candle("ABC", Candle::flat(100, 2.0));
        let res = builder.build();
        assert!(matches!(
            res,
            Err(SourceError::DuplicateTimestamp { .. })
        ));
    }

    #[test]
    fn test_that_candle_with_low_above_high_is_rejected() {
        let mut builder = CandleSourceBuilder::new();
        builder.add_candle("ABC", Candle::new(100, 10.0, 9.0, 11.0, 10.0, 1.0));
        assert!(matches!(
            builder.build(),
            Err(SourceError::MalformedCandle { .. })
        ));
    }
}
