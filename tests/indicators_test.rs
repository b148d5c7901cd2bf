//! Integration tests for the indicator engine and risk metrics

use chrono::NaiveDate;
use tiker::services::signals::indicators::{BB_LOWER, BB_MIDDLE, BB_UPPER};
use tiker::{IndicatorEngine, PriceBar, PriceSeries, RiskAssessor};

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 2).unwrap()
}

/// Deterministic choppy series with wide intraday ranges.
fn choppy(count: usize) -> PriceSeries {
    let bars = (0..count)
        .zip(start().iter_days())
        .map(|(i, date)| {
            let x = i as f64;
            let close = 100.0 + 10.0 * (x * 0.37).sin() + 4.0 * (x * 1.3).cos();
            let spread = 1.0 + (x * 0.5).sin().abs() * 3.0;
            PriceBar::new(date, close - 0.5, close + spread, close - spread, close, 5_000.0 + x)
        })
        .collect();
    PriceSeries::new(bars).unwrap()
}

fn first_defined(column: &[Option<f64>]) -> Option<usize> {
    column.iter().position(Option::is_some)
}

fn defined_from(column: &[Option<f64>], index: usize) -> bool {
    column[..index].iter().all(Option::is_none) && column[index..].iter().all(Option::is_some)
}

#[test]
fn test_columns_defined_exactly_from_window() {
    let series = choppy(260);
    let set = IndicatorEngine::default().compute(&series);

    assert!(defined_from(set.get("EMA20").unwrap(), 0));
    assert!(defined_from(set.get("EMA50").unwrap(), 0));
    assert!(defined_from(set.get("SMA50").unwrap(), 49));
    assert!(defined_from(set.get("SMA200").unwrap(), 199));
    assert!(defined_from(set.get("RSI14").unwrap(), 14));
    assert!(defined_from(set.get(BB_UPPER).unwrap(), 19));
    assert!(defined_from(set.get("ATR14").unwrap(), 13));
}

#[test]
fn test_rsi_bounded() {
    for period in [2, 5, 14, 30] {
        let column = IndicatorEngine::rsi(&choppy(200), period);
        assert_eq!(first_defined(&column), Some(period));
        for value in column.iter().flatten() {
            assert!((0.0..=100.0).contains(value), "RSI{} out of range: {}", period, value);
        }
    }
}

#[test]
fn test_bollinger_ordering() {
    for std_dev in [0.0, 1.0, 2.0, 3.5] {
        let set = IndicatorEngine::bollinger_bands(&choppy(120), 20, std_dev);
        for i in 0..120 {
            if let (Some(u), Some(m), Some(l)) = (
                set.value_at(BB_UPPER, i),
                set.value_at(BB_MIDDLE, i),
                set.value_at(BB_LOWER, i),
            ) {
                assert!(u >= m && m >= l, "bands out of order at {}", i);
            }
        }
    }
}

#[test]
fn test_atr_non_negative_with_inverted_bars() {
    let bars = (0..40)
        .zip(start().iter_days())
        .map(|(i, date)| {
            let c = 50.0 + i as f64;
            // every third bar has high and low swapped
            if i % 3 == 0 {
                PriceBar::new(date, c, c - 2.0, c + 2.0, c, 100.0)
            } else {
                PriceBar::new(date, c, c + 2.0, c - 2.0, c, 100.0)
            }
        })
        .collect();
    let series = PriceSeries::new(bars).unwrap();
    let column = IndicatorEngine::atr(&series, 14);
    assert!(column.iter().flatten().all(|v| *v >= 0.0));
    assert_eq!(first_defined(&column), Some(13));
}

#[test]
fn test_malformed_bar_does_not_corrupt_series() {
    let mut bars: Vec<PriceBar> = choppy(80).bars().to_vec();
    bars[30].close = f64::NAN;
    bars[30].high = f64::INFINITY;
    let series = PriceSeries::new(bars).unwrap();

    let sma = IndicatorEngine::moving_averages(&series, 20, 50, 10);
    let column = sma.get("SMA10").unwrap();
    assert!(column[30..40].iter().all(Option::is_none));
    assert!(column[40..].iter().all(Option::is_some));

    let atr = IndicatorEngine::atr(&series, 5);
    // the bar after falls back to its own range
    assert!(atr[29].is_some());
    assert!(atr[30..35].iter().all(Option::is_none));
    assert!(atr[35..].iter().all(Option::is_some));
}

#[test]
fn test_short_series_is_undefined_not_error() {
    let series = PriceSeries::from_closes(start(), &[100.0, 101.0]);
    let set = IndicatorEngine::default().compute(&series);
    assert_eq!(set.latest("SMA200"), None);
    assert_eq!(set.latest("RSI14"), None);
    assert_eq!(set.latest(BB_UPPER), None);
    assert!(set.latest("EMA20").is_some());
}

#[test]
fn test_five_flat_bars() {
    let series = PriceSeries::from_closes(start(), &[100.0; 5]);
    let assessor = RiskAssessor::default();

    assert_eq!(assessor.volatility(&series), 0.0);
    assert_eq!(RiskAssessor::max_drawdown(&series), 0.0);

    let rsi = IndicatorEngine::rsi(&series, 4);
    let first = first_defined(&rsi).unwrap();
    assert_eq!(rsi[first], Some(100.0));

    let bands = IndicatorEngine::bollinger_bands(&series, 5, 2.0);
    assert_eq!(bands.latest(BB_UPPER), Some(100.0));
    assert_eq!(bands.latest(BB_MIDDLE), Some(100.0));
    assert_eq!(bands.latest(BB_LOWER), Some(100.0));
}
