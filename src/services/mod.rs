pub mod analyzer;
pub mod history;
pub mod risk;
pub mod scoring;
pub mod signals;

pub use analyzer::{Analysis, Analyzer, PortfolioEntry};
pub use history::SignalHistoryTracker;
pub use risk::{RiskAssessor, RiskProfile};
pub use scoring::{CompositeScorer, FactorInputs, FactorScorer, RuleTable, ScoreRule, TierTable};
pub use signals::{Indicator, IndicatorEngine};
