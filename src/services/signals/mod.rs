//! Technical indicator service module.
//!
//! Provides the indicator trait, the standard indicator set and the engine
//! that evaluates them over a price series.

pub mod engine;
pub mod indicators;

pub use engine::IndicatorEngine;

use crate::types::{IndicatorSet, PriceSeries};

/// Trait for implementing technical indicators.
pub trait Indicator: Send + Sync {
    /// Unique identifier for this indicator, e.g. "EMA20".
    fn id(&self) -> &str;

    /// Human-readable name.
    fn name(&self) -> &str;

    /// Number of bars needed before the first defined value.
    fn min_periods(&self) -> usize;

    /// Calculate the indicator's columns, aligned with `series`.
    /// Positions without enough history are `None`.
    fn calculate(&self, series: &PriceSeries) -> IndicatorSet;
}
