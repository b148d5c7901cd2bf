//! Category scoring and the composite decision.

pub mod composite;
pub mod factors;
pub mod rules;

pub use composite::{CompositeScorer, TierTable};
pub use factors::FactorScorer;
pub use rules::{FactorInputs, RuleTable, ScoreRule};
