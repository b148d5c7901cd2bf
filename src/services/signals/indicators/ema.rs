//! Exponential Moving Average (EMA) indicator.

use super::ema_name;
use crate::services::signals::Indicator;
use crate::types::{IndicatorColumn, IndicatorSet, PriceSeries};

/// EMA (Exponential Moving Average) of the close.
///
/// Recursive weighting with smoothing factor `2 / (span + 1)`, seeded by the
/// first usable close, so it is defined from the first bar onwards. A malformed
/// close leaves its own position undefined and the recursion carries over it.
pub struct Ema {
    span: usize,
    id: String,
}

impl Ema {
    pub fn new(span: usize) -> Self {
        Self {
            span,
            id: ema_name(span),
        }
    }

    /// Calculate the EMA column over a close column.
    pub fn calculate_ema(closes: &[Option<f64>], span: usize) -> IndicatorColumn {
        if span == 0 {
            return vec![None; closes.len()];
        }

        let alpha = 2.0 / (span as f64 + 1.0);
        let mut ema: Option<f64> = None;

        closes
            .iter()
            .map(|close| {
                let close = (*close)?;
                let next = match ema {
                    Some(prev) => alpha * close + (1.0 - alpha) * prev,
                    None => close,
                };
                ema = Some(next);
                Some(next)
            })
            .collect()
    }
}

impl Indicator for Ema {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        "Exponential Moving Average"
    }

    fn min_periods(&self) -> usize {
        1
    }

    fn calculate(&self, series: &PriceSeries) -> IndicatorSet {
        let mut set = IndicatorSet::new(series.len());
        set.insert(self.id.clone(), Self::calculate_ema(&series.closes(), self.span));
        set
    }
}
