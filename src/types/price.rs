use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A single daily OHLCV bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl PriceBar {
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// A bar where every field is `close`, useful for close-only data.
    pub fn flat(date: NaiveDate, close: f64, volume: f64) -> Self {
        Self::new(date, close, close, close, close, volume)
    }

    /// Close price if it is usable (finite and positive).
    pub fn valid_close(&self) -> Option<f64> {
        valid_price(self.close)
    }

    /// High and low if both are usable. Inverted bars are tolerated.
    pub fn valid_range(&self) -> Option<(f64, f64)> {
        Some((valid_price(self.high)?, valid_price(self.low)?))
    }

    /// Volume if it is finite and non-negative.
    pub fn valid_volume(&self) -> Option<f64> {
        (self.volume.is_finite() && self.volume >= 0.0).then_some(self.volume)
    }

    /// True when any price or the volume is non-finite or out of range.
    pub fn is_malformed(&self) -> bool {
        [self.open, self.high, self.low, self.close]
            .iter()
            .any(|p| valid_price(*p).is_none())
            || self.valid_volume().is_none()
    }

    /// True when `low <= open, close <= high` holds.
    pub fn is_consistent(&self) -> bool {
        self.low <= self.open.min(self.close) && self.high >= self.open.max(self.close)
    }
}

fn valid_price(value: f64) -> Option<f64> {
    (value.is_finite() && value > 0.0).then_some(value)
}

/// Ordered, immutable series of bars with strictly increasing dates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<PriceBar>", into = "Vec<PriceBar>")]
pub struct PriceSeries {
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    /// Build a series, rejecting unordered or duplicate dates.
    pub fn new(bars: Vec<PriceBar>) -> Result<Self> {
        if let Some(pair) = bars.windows(2).find(|w| w[1].date <= w[0].date) {
            return Err(Error::InvalidSeries(format!(
                "dates must be strictly increasing ({} followed by {})",
                pair[0].date, pair[1].date
            )));
        }
        Ok(Self { bars })
    }

    /// Build a series from close prices on consecutive calendar days.
    pub fn from_closes(start: NaiveDate, closes: &[f64]) -> Self {
        let bars = closes
            .iter()
            .zip(start.iter_days())
            .map(|(close, date)| PriceBar::flat(date, *close, 0.0))
            .collect();
        Self { bars }
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Close column with malformed positions as `None`.
    pub fn closes(&self) -> Vec<Option<f64>> {
        self.bars.iter().map(PriceBar::valid_close).collect()
    }

    /// Volume column with malformed positions as `None`.
    pub fn volumes(&self) -> Vec<Option<f64>> {
        self.bars.iter().map(PriceBar::valid_volume).collect()
    }

    /// Most recent usable close.
    pub fn last_close(&self) -> Option<f64> {
        self.bars.iter().rev().find_map(PriceBar::valid_close)
    }

    /// Date of the final bar.
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date)
    }

    /// Prefix of the first `len` bars, used for replaying a series bar by bar.
    pub fn truncated(&self, len: usize) -> Self {
        Self {
            bars: self.bars[..len.min(self.bars.len())].to_vec(),
        }
    }
}

impl TryFrom<Vec<PriceBar>> for PriceSeries {
    type Error = Error;

    fn try_from(bars: Vec<PriceBar>) -> Result<Self> {
        Self::new(bars)
    }
}

impl From<PriceSeries> for Vec<PriceBar> {
    fn from(series: PriceSeries) -> Self {
        series.bars
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, n).unwrap()
    }

    #[test]
    fn test_series_rejects_duplicate_dates() {
        let bars = vec![PriceBar::flat(day(1), 10.0, 0.0), PriceBar::flat(day(1), 11.0, 0.0)];
        let err = PriceSeries::new(bars).unwrap_err();
        assert!(matches!(err, Error::InvalidSeries(_)));
        assert!(!err.is_configuration());
    }

    #[test]
    fn test_series_rejects_decreasing_dates() {
        let bars = vec![PriceBar::flat(day(3), 10.0, 0.0), PriceBar::flat(day(2), 11.0, 0.0)];
        assert!(PriceSeries::new(bars).is_err());
    }

    #[test]
    fn test_malformed_close_is_none() {
        let mut bar = PriceBar::flat(day(1), 10.0, 100.0);
        assert!(!bar.is_malformed());
        bar.close = f64::NAN;
        assert!(bar.is_malformed());
        assert_eq!(bar.valid_close(), None);
        bar.close = -1.0;
        assert_eq!(bar.valid_close(), None);
    }

    #[test]
    fn test_inverted_bar_is_inconsistent_but_usable() {
        let bar = PriceBar::new(day(1), 10.0, 9.0, 11.0, 10.0, 5.0);
        assert!(!bar.is_consistent());
        assert!(!bar.is_malformed());
        assert_eq!(bar.valid_range(), Some((9.0, 11.0)));
    }

    #[test]
    fn test_last_close_skips_bad_bars() {
        let series = PriceSeries::from_closes(day(1), &[10.0, 12.0, f64::NAN]);
        assert_eq!(series.last_close(), Some(12.0));
        assert_eq!(series.len(), 3);
    }

    #[test]
    fn test_series_deserialize_validates_order() {
        let json = r#"[
            {"date":"2024-01-02","open":1.0,"high":1.0,"low":1.0,"close":1.0,"volume":0.0},
            {"date":"2024-01-01","open":1.0,"high":1.0,"low":1.0,"close":1.0,"volume":0.0}
        ]"#;
        assert!(serde_json::from_str::<PriceSeries>(json).is_err());
    }
}
