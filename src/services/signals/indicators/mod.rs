//! Technical indicator implementations.

pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod rolling;
pub mod rsi;
pub mod sma;

pub use atr::Atr;
pub use bollinger::BollingerBands;
pub use ema::Ema;
pub use rsi::Rsi;
pub use sma::Sma;

use super::Indicator;
use crate::config::IndicatorConfig;

/// Column name for an EMA of the given span, e.g. "EMA20".
pub fn ema_name(span: usize) -> String {
    format!("EMA{}", span)
}

/// Column name for an SMA of the given window, e.g. "SMA200".
pub fn sma_name(window: usize) -> String {
    format!("SMA{}", window)
}

/// Column name for an RSI of the given period, e.g. "RSI14".
pub fn rsi_name(period: usize) -> String {
    format!("RSI{}", period)
}

/// Column name for an ATR of the given period, e.g. "ATR14".
pub fn atr_name(period: usize) -> String {
    format!("ATR{}", period)
}

pub const BB_UPPER: &str = "BB_upper";
pub const BB_MIDDLE: &str = "BB_middle";
pub const BB_LOWER: &str = "BB_lower";
pub const BB_STD: &str = "BB_std";
pub const BB_PERCENT_B: &str = "BB_percent_b";

/// Indicators used by the scoring pipeline for the given configuration.
pub fn standard_indicators(config: &IndicatorConfig) -> Vec<Box<dyn Indicator>> {
    let mut indicators: Vec<Box<dyn Indicator>> = vec![
        // Trend indicators
        Box::new(Ema::new(config.ema_short)),
        Box::new(Ema::new(config.ema_long)),
        Box::new(Sma::new(config.sma_long)),
    ];
    if config.sma_trend != config.sma_long {
        indicators.push(Box::new(Sma::new(config.sma_trend)));
    }
    // Momentum indicators
    indicators.push(Box::new(Rsi::new(config.rsi_period)));
    // Volatility indicators
    indicators.push(Box::new(BollingerBands::new(config.bb_period, config.bb_std_dev)));
    indicators.push(Box::new(Atr::new(config.atr_period)));
    indicators
}
