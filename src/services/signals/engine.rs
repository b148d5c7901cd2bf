//! Indicator engine: evaluates a set of indicators over a price series.

use crate::config::IndicatorConfig;
use crate::services::signals::indicators::{standard_indicators, Atr, BollingerBands, Ema, Rsi, Sma};
use crate::services::signals::Indicator;
use crate::types::{IndicatorColumn, IndicatorSet, PriceSeries};
use tracing::{debug, warn};

/// Stateless engine that runs a registry of indicators over a series.
///
/// Every produced column has the same length as the input series. Positions
/// without enough history, or whose window covers a malformed bar, are `None`.
pub struct IndicatorEngine {
    indicators: Vec<Box<dyn Indicator>>,
}

impl IndicatorEngine {
    /// Create an engine over an explicit indicator list.
    pub fn new(indicators: Vec<Box<dyn Indicator>>) -> Self {
        Self { indicators }
    }

    /// Create an engine with the standard indicators for `config`.
    pub fn from_config(config: &IndicatorConfig) -> Self {
        Self::new(standard_indicators(config))
    }

    /// Ids of the registered indicators.
    pub fn indicator_ids(&self) -> Vec<&str> {
        self.indicators.iter().map(|i| i.id()).collect()
    }

    /// Compute every registered indicator and merge the columns.
    pub fn compute(&self, series: &PriceSeries) -> IndicatorSet {
        let malformed = series.bars().iter().filter(|b| b.is_malformed()).count();
        if malformed > 0 {
            warn!(
                "{} malformed bar(s) in series of {}; affected windows will be undefined",
                malformed,
                series.len()
            );
        }

        debug!(
            "Computing {} indicators over {} bars",
            self.indicators.len(),
            series.len()
        );

        let mut set = IndicatorSet::new(series.len());
        for indicator in &self.indicators {
            if series.len() < indicator.min_periods() {
                debug!(
                    "{} needs {} bars, have {}; column stays undefined",
                    indicator.id(),
                    indicator.min_periods(),
                    series.len()
                );
            }
            set.extend(indicator.calculate(series));
        }
        set
    }

    /// EMA(short_span), EMA(long_span) and SMA(sma_window) of the close.
    pub fn moving_averages(
        series: &PriceSeries,
        short_span: usize,
        long_span: usize,
        sma_window: usize,
    ) -> IndicatorSet {
        let mut set = IndicatorSet::new(series.len());
        set.extend(Ema::new(short_span).calculate(series));
        set.extend(Ema::new(long_span).calculate(series));
        set.extend(Sma::new(sma_window).calculate(series));
        set
    }

    /// RSI column over `period` day-over-day differences.
    pub fn rsi(series: &PriceSeries, period: usize) -> IndicatorColumn {
        Rsi::calculate_rsi(&series.closes(), period)
    }

    /// Bollinger band columns (`BB_upper`, `BB_middle`, `BB_lower`, `BB_std`, `BB_percent_b`).
    pub fn bollinger_bands(series: &PriceSeries, period: usize, std_dev: f64) -> IndicatorSet {
        BollingerBands::new(period, std_dev).calculate(series)
    }

    /// ATR column over `period` bars.
    pub fn atr(series: &PriceSeries, period: usize) -> IndicatorColumn {
        let atr = Atr::new(period);
        let mut set = atr.calculate(series);
        set.take(atr.id()).unwrap_or_else(|| vec![None; series.len()])
    }
}

impl Default for IndicatorEngine {
    fn default() -> Self {
        Self::from_config(&IndicatorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::signals::indicators::test_support::{closes, uptrend};
    use crate::services::signals::indicators::{BB_LOWER, BB_MIDDLE, BB_UPPER};

    #[test]
    fn test_compute_produces_all_columns() {
        let set = IndicatorEngine::default().compute(&uptrend(250));
        for name in ["EMA20", "EMA50", "SMA200", "SMA50", "RSI14", BB_UPPER, BB_MIDDLE, BB_LOWER, "BB_std", "ATR14"] {
            assert!(set.contains(name), "missing column {}", name);
            assert!(set.latest(name).is_some(), "{} undefined at end", name);
        }
        assert_eq!(set.series_len(), 250);
    }

    #[test]
    fn test_compute_short_series_keeps_alignment() {
        let set = IndicatorEngine::default().compute(&uptrend(30));
        assert_eq!(set.get("SMA200").unwrap().len(), 30);
        assert_eq!(set.latest("SMA200"), None);
        assert!(set.latest("EMA20").is_some());
    }

    #[test]
    fn test_moving_averages_empty_input() {
        let set = IndicatorEngine::moving_averages(&closes(&[]), 20, 50, 200);
        assert!(set.is_empty());
        assert!(set.contains("EMA20") && set.contains("EMA50") && set.contains("SMA200"));
    }

    #[test]
    fn test_bad_bar_only_affects_its_window() {
        let mut values: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        values[10] = f64::NAN;
        let set = IndicatorEngine::moving_averages(&closes(&values), 5, 10, 5);
        let sma = set.get("SMA5").unwrap();
        assert!(sma[10..15].iter().all(Option::is_none));
        assert!(sma[15..].iter().all(Option::is_some));
        assert!(set.latest("EMA10").is_some());
    }

    #[test]
    fn test_atr_column_length() {
        let column = IndicatorEngine::atr(&uptrend(20), 14);
        assert_eq!(column.len(), 20);
        assert!(column[12].is_none());
        assert!(column[13].is_some());
    }

    #[test]
    fn test_rsi_column() {
        let column = IndicatorEngine::rsi(&closes(&[100.0; 5]), 3);
        assert_eq!(column[3], Some(100.0));
        assert!(column[..3].iter().all(Option::is_none));
    }
}
