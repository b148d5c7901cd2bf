//! Risk summary of a price series: volatility, drawdown and Sharpe ratio.

use crate::services::signals::indicators::rolling::sample_std;
use crate::types::PriceSeries;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Trading days per year used for annualization.
pub const TRADING_DAYS: f64 = 252.0;

/// Annual risk-free rate subtracted in the Sharpe ratio.
pub const RISK_FREE_RATE: f64 = 0.02;

/// Risk metrics for one series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskProfile {
    /// Annualized volatility of daily returns (0 when undefined).
    pub volatility: f64,
    /// Most negative drawdown, as a fraction (<= 0).
    pub max_drawdown: f64,
    /// Annualized Sharpe ratio, `None` when volatility is 0.
    pub sharpe_ratio: Option<f64>,
    /// Number of daily returns the metrics were computed from.
    pub sample_size: usize,
}

impl RiskProfile {
    /// True when there were at least two returns to measure dispersion.
    pub fn has_volatility(&self) -> bool {
        self.sample_size >= 2
    }
}

/// Summarizes a series' risk profile for scoring.
#[derive(Debug, Clone, Copy)]
pub struct RiskAssessor {
    trading_days: f64,
    risk_free_rate: f64,
}

impl Default for RiskAssessor {
    fn default() -> Self {
        Self::new(TRADING_DAYS, RISK_FREE_RATE)
    }
}

impl RiskAssessor {
    pub fn new(trading_days: f64, risk_free_rate: f64) -> Self {
        Self {
            trading_days,
            risk_free_rate,
        }
    }

    /// Day-over-day percentage returns between consecutive usable closes.
    ///
    /// A pair touching a malformed close produces no return.
    pub fn daily_returns(series: &PriceSeries) -> Vec<f64> {
        series
            .closes()
            .windows(2)
            .filter_map(|w| match (w[0], w[1]) {
                (Some(prev), Some(curr)) => Some(curr / prev - 1.0),
                _ => None,
            })
            .collect()
    }

    /// Annualized standard deviation of daily returns.
    ///
    /// 0 for fewer than two returns or a constant series.
    pub fn volatility(&self, series: &PriceSeries) -> f64 {
        self.annualize(&Self::daily_returns(series))
    }

    fn annualize(&self, returns: &[f64]) -> f64 {
        sample_std(returns) * self.trading_days.sqrt()
    }

    /// Most negative drawdown of the cumulative return curve (<= 0).
    pub fn max_drawdown(series: &PriceSeries) -> f64 {
        Self::drawdown_of(&Self::daily_returns(series))
    }

    fn drawdown_of(returns: &[f64]) -> f64 {
        // The curve starts at the first close (1.0), so a decline on the first
        // return counts. A cumprod of returns alone would start its peak after
        // that first move and miss it.
        let mut cumulative = 1.0;
        let mut running_max = 1.0_f64;
        let mut worst = 0.0_f64;

        for r in returns {
            cumulative *= 1.0 + r;
            running_max = running_max.max(cumulative);
            worst = worst.min((cumulative - running_max) / running_max);
        }
        worst
    }

    /// (annualized mean return - risk free rate) / volatility.
    pub fn sharpe_ratio(&self, series: &PriceSeries) -> Option<f64> {
        self.sharpe_of(&Self::daily_returns(series))
    }

    fn sharpe_of(&self, returns: &[f64]) -> Option<f64> {
        let volatility = self.annualize(returns);
        if volatility <= 0.0 || !volatility.is_finite() {
            return None;
        }
        let mean = returns.iter().sum::<f64>() / returns.len() as f64;
        Some((mean * self.trading_days - self.risk_free_rate) / volatility)
    }

    /// All risk metrics in one pass over the returns.
    pub fn assess(&self, series: &PriceSeries) -> RiskProfile {
        let returns = Self::daily_returns(series);
        let profile = RiskProfile {
            volatility: self.annualize(&returns),
            max_drawdown: Self::drawdown_of(&returns),
            sharpe_ratio: self.sharpe_of(&returns),
            sample_size: returns.len(),
        };
        debug!(
            "Risk over {} returns: vol={:.4} dd={:.4}",
            profile.sample_size, profile.volatility, profile.max_drawdown
        );
        profile
    }
}
