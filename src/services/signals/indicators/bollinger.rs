//! Bollinger Bands indicator.

use super::rolling::{rolling_mean, rolling_std};
use super::{BB_LOWER, BB_MIDDLE, BB_PERCENT_B, BB_STD, BB_UPPER};
use crate::services::signals::Indicator;
use crate::types::{IndicatorSet, PriceSeries};

/// Bollinger Bands indicator.
///
/// Consists of:
/// - Middle band: SMA(period)
/// - Upper band: SMA + k * StdDev
/// - Lower band: SMA - k * StdDev
///
/// StdDev is the sample standard deviation of the trailing closes. Also emits
/// %B, where the close sits relative to the bands (0.5 when the bands collapse).
pub struct BollingerBands {
    period: usize,
    std_dev_multiplier: f64,
    id: String,
}

impl Default for BollingerBands {
    fn default() -> Self {
        Self::new(20, 2.0)
    }
}

impl BollingerBands {
    /// A negative multiplier is treated as its magnitude so the bands never cross.
    pub fn new(period: usize, std_dev_multiplier: f64) -> Self {
        Self {
            period,
            std_dev_multiplier: std_dev_multiplier.abs(),
            id: format!("BB{}", period),
        }
    }
}

impl Indicator for BollingerBands {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        "Bollinger Bands"
    }

    fn min_periods(&self) -> usize {
        self.period
    }

    fn calculate(&self, series: &PriceSeries) -> IndicatorSet {
        let closes = series.closes();
        let middle = rolling_mean(&closes, self.period);
        let std = rolling_std(&closes, self.period);

        let mut upper = Vec::with_capacity(closes.len());
        let mut lower = Vec::with_capacity(closes.len());
        let mut percent_b = Vec::with_capacity(closes.len());

        for i in 0..closes.len() {
            let bands = match (middle[i], std[i]) {
                (Some(m), Some(s)) => {
                    let up = m + self.std_dev_multiplier * s;
                    let low = m - self.std_dev_multiplier * s;
                    Some((up, low)).filter(|(up, low)| up.is_finite() && low.is_finite())
                }
                _ => None,
            };
            match bands {
                Some((up, low)) => {
                    let band_width = up - low;
                    upper.push(Some(up));
                    lower.push(Some(low));
                    percent_b.push(closes[i].map(|close| {
                        if band_width > 0.0 {
                            (close - low) / band_width
                        } else {
                            0.5
                        }
                    }));
                }
                _ => {
                    upper.push(None);
                    lower.push(None);
                    percent_b.push(None);
                }
            }
        }

        let mut set = IndicatorSet::new(series.len());
        set.insert(BB_UPPER, upper);
        set.insert(BB_MIDDLE, middle);
        set.insert(BB_LOWER, lower);
        set.insert(BB_STD, std);
        set.insert(BB_PERCENT_B, percent_b);
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::signals::indicators::test_support::{closes, uptrend};

    #[test]
    fn test_bollinger_min_periods() {
        assert_eq!(BollingerBands::default().min_periods(), 20);
    }

    #[test]
    fn test_bollinger_flat_series_collapses() {
        let set = BollingerBands::new(5, 2.0).calculate(&closes(&[100.0; 5]));
        assert_eq!(set.latest(BB_UPPER), Some(100.0));
        assert_eq!(set.latest(BB_MIDDLE), Some(100.0));
        assert_eq!(set.latest(BB_LOWER), Some(100.0));
        assert_eq!(set.latest(BB_PERCENT_B), Some(0.5));
    }

    #[test]
    fn test_bollinger_uses_sample_std() {
        let set = BollingerBands::new(3, 1.0).calculate(&closes(&[1.0, 2.0, 3.0]));
        // sample std of 1,2,3 is 1
        assert_eq!(set.latest(BB_STD), Some(1.0));
        assert_eq!(set.latest(BB_UPPER), Some(3.0));
        assert_eq!(set.latest(BB_LOWER), Some(1.0));
    }

    #[test]
    fn test_bollinger_band_order() {
        let set = BollingerBands::default().calculate(&uptrend(60));
        for i in 0..60 {
            match (
                set.value_at(BB_UPPER, i),
                set.value_at(BB_MIDDLE, i),
                set.value_at(BB_LOWER, i),
            ) {
                (Some(u), Some(m), Some(l)) => assert!(u >= m && m >= l),
                (None, None, None) => assert!(i < 19),
                other => panic!("misaligned bands at {}: {:?}", i, other),
            }
        }
    }

    #[test]
    fn test_bollinger_negative_multiplier_keeps_order() {
        let set = BollingerBands::new(3, -2.0).calculate(&closes(&[1.0, 3.0, 2.0]));
        assert!(set.latest(BB_UPPER).unwrap() >= set.latest(BB_LOWER).unwrap());
    }

    #[test]
    fn test_bollinger_overflow_is_undefined() {
        let values: Vec<f64> = (0..10)
            .map(|i| if i % 2 == 0 { 1e307 } else { 1.7e308 })
            .collect();
        let set = BollingerBands::new(3, 2.0).calculate(&closes(&values));
        for name in [BB_UPPER, BB_MIDDLE, BB_LOWER, BB_STD, BB_PERCENT_B] {
            for value in set.get(name).unwrap().iter().flatten() {
                assert!(value.is_finite(), "{} not finite: {}", name, value);
            }
        }
        assert_eq!(set.latest(BB_LOWER), None);
    }
}
