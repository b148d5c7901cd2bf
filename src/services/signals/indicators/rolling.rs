//! Trailing-window helpers over columns with missing values.
//!
//! A window containing any missing value yields a missing result, so a single
//! bad input only affects the positions whose window covers it. A window
//! whose sum overflows is missing as well.

use crate::types::IndicatorColumn;

/// Values of the trailing window ending at `end`, if every one is defined.
fn window(values: &[Option<f64>], end: usize, len: usize) -> Option<Vec<f64>> {
    if len == 0 || end + 1 < len {
        return None;
    }
    values[end + 1 - len..=end].iter().copied().collect()
}

/// Arithmetic mean of the trailing `len` values.
pub fn rolling_mean(values: &[Option<f64>], len: usize) -> IndicatorColumn {
    (0..values.len())
        .map(|i| {
            let w = window(values, i, len)?;
            Some(w.iter().sum::<f64>() / len as f64).filter(|m| m.is_finite())
        })
        .collect()
}

/// Sample standard deviation (n − 1 denominator) of the trailing `len` values.
/// A window of one value has zero deviation.
pub fn rolling_std(values: &[Option<f64>], len: usize) -> IndicatorColumn {
    (0..values.len())
        .map(|i| {
            let w = window(values, i, len)?;
            Some(sample_std(&w)).filter(|s| s.is_finite())
        })
        .collect()
}

/// Sample standard deviation of a slice, 0 for fewer than two values.
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
        / (values.len() - 1) as f64;
    variance.max(0.0).sqrt()
}
