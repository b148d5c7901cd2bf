//! Simple Moving Average (SMA) indicator.

use super::rolling::rolling_mean;
use super::sma_name;
use crate::services::signals::Indicator;
use crate::types::{IndicatorSet, PriceSeries};

/// SMA (Simple Moving Average) of the close.
///
/// Undefined for the first `window - 1` positions, then the mean of the
/// trailing `window` closes.
pub struct Sma {
    window: usize,
    id: String,
}

impl Sma {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            id: sma_name(window),
        }
    }
}

impl Indicator for Sma {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        "Simple Moving Average"
    }

    fn min_periods(&self) -> usize {
        self.window
    }

    fn calculate(&self, series: &PriceSeries) -> IndicatorSet {
        let mut set = IndicatorSet::new(series.len());
        set.insert(self.id.clone(), rolling_mean(&series.closes(), self.window));
        set
    }
}
