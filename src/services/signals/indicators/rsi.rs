//! Relative Strength Index (RSI) indicator.

use super::rolling::rolling_mean;
use super::rsi_name;
use crate::services::signals::Indicator;
use crate::types::{IndicatorColumn, IndicatorSet, PriceSeries};

/// RSI (Relative Strength Index) indicator.
///
/// Measures momentum by comparing the magnitude of recent gains to recent losses.
/// Values range from 0-100:
/// - Below 30: Oversold
/// - Above 70: Overbought
///
/// Gains and losses are averaged with a plain rolling mean over `period`
/// day-over-day differences, so the first `period` positions are undefined.
/// When the average loss is exactly zero the RSI is 100.
pub struct Rsi {
    period: usize,
    id: String,
}

impl Default for Rsi {
    fn default() -> Self {
        Self::new(14)
    }
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            id: rsi_name(period),
        }
    }

    /// Calculate the RSI column from a close column.
    pub fn calculate_rsi(closes: &[Option<f64>], period: usize) -> IndicatorColumn {
        let mut gains = vec![None; closes.len()];
        let mut losses = vec![None; closes.len()];

        for i in 1..closes.len() {
            if let (Some(prev), Some(curr)) = (closes[i - 1], closes[i]) {
                let change = curr - prev;
                gains[i] = Some(change.max(0.0));
                losses[i] = Some((-change).max(0.0));
            }
        }

        let avg_gains = rolling_mean(&gains, period);
        let avg_losses = rolling_mean(&losses, period);

        avg_gains
            .iter()
            .zip(&avg_losses)
            .map(|(gain, loss)| {
                let (avg_gain, avg_loss) = ((*gain)?, (*loss)?);
                if avg_loss == 0.0 {
                    return Some(100.0);
                }
                let rs = avg_gain / avg_loss;
                if rs.is_nan() {
                    return None;
                }
                Some((100.0 - 100.0 / (1.0 + rs)).clamp(0.0, 100.0))
            })
            .collect()
    }
}

impl Indicator for Rsi {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        "Relative Strength Index"
    }

    fn min_periods(&self) -> usize {
        self.period + 1
    }

    fn calculate(&self, series: &PriceSeries) -> IndicatorSet {
        let mut set = IndicatorSet::new(series.len());
        set.insert(self.id.clone(), Self::calculate_rsi(&series.closes(), self.period));
        set
    }
}
