//! Average True Range (ATR) indicator.

use super::atr_name;
use super::rolling::rolling_mean;
use crate::services::signals::Indicator;
use crate::types::{IndicatorColumn, IndicatorSet, PriceBar, PriceSeries};

/// ATR (Average True Range) indicator.
///
/// Measures market volatility by averaging true ranges:
/// TR = max(High-Low, |High-PrevClose|, |Low-PrevClose|)
///
/// The first bar (or a bar after a malformed close) uses High-Low alone.
/// ATR is the plain rolling mean of TR over `period`.
pub struct Atr {
    period: usize,
    id: String,
}

impl Default for Atr {
    fn default() -> Self {
        Self::new(14)
    }
}

impl Atr {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            id: atr_name(period),
        }
    }

    /// Calculate True Range. Inverted bars contribute their absolute range.
    fn true_range(current: &PriceBar, previous_close: Option<f64>) -> Option<f64> {
        let (high, low) = current.valid_range()?;
        let hl = (high - low).abs();
        Some(match previous_close {
            Some(pc) => hl.max((high - pc).abs()).max((low - pc).abs()),
            None => hl,
        })
    }

    /// True range column for a series.
    pub fn true_ranges(series: &PriceSeries) -> IndicatorColumn {
        let bars = series.bars();
        (0..bars.len())
            .map(|i| {
                let previous_close = i.checked_sub(1).and_then(|p| bars[p].valid_close());
                Self::true_range(&bars[i], previous_close)
            })
            .collect()
    }
}

impl Indicator for Atr {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        "Average True Range"
    }

    fn min_periods(&self) -> usize {
        self.period
    }

    fn calculate(&self, series: &PriceSeries) -> IndicatorSet {
        let mut set = IndicatorSet::new(series.len());
        set.insert(self.id.clone(), rolling_mean(&Self::true_ranges(series), self.period));
        set
    }
}
