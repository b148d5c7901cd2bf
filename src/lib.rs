//! Tiker - technical indicators and composite scoring for stock portfolios
//!
//! Computes indicators (EMA, SMA, RSI, Bollinger Bands, ATR) and risk metrics
//! from daily price series, turns them into rule-based category scores, combines
//! those into a recommendation and tracks how past recommendations performed.

pub mod config;
pub mod error;
pub mod services;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
pub use services::{
    Analysis, Analyzer, CompositeScorer, FactorScorer, IndicatorEngine, RiskAssessor,
    RiskProfile, SignalHistoryTracker, TierTable,
};
pub use types::*;
