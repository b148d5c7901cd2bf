//! Weighted combination of category scores and tier classification.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::types::{Category, CategoryScores, CompositeScore, Recommendation, NEUTRAL_SCORE};
use std::collections::BTreeMap;
use tracing::debug;

/// Boundary table mapping an overall score to a recommendation.
///
/// Cut points are evaluated high to low; the first one the score reaches wins,
/// otherwise the floor tier applies.
#[derive(Debug, Clone, PartialEq)]
pub struct TierTable {
    name: String,
    cuts: Vec<(f64, Recommendation)>,
    floor: Recommendation,
}

impl TierTable {
    /// Build a custom table. Cut points must be finite and strictly descending.
    pub fn new(
        name: impl Into<String>,
        cuts: Vec<(f64, Recommendation)>,
        floor: Recommendation,
    ) -> Result<Self> {
        let name = name.into();
        if cuts.is_empty() {
            return Err(Error::InvalidTierTable(format!("{}: no cut points", name)));
        }
        if cuts.iter().any(|(cut, _)| !cut.is_finite()) {
            return Err(Error::InvalidTierTable(format!(
                "{}: cut points must be finite",
                name
            )));
        }
        if cuts.windows(2).any(|w| w[1].0 >= w[0].0) {
            return Err(Error::InvalidTierTable(format!(
                "{}: cut points must be strictly descending",
                name
            )));
        }
        Ok(Self { name, cuts, floor })
    }

    /// Canonical five-tier table: 4.5 / 3.5 / 2.5 / 1.5.
    pub fn five_tier() -> Self {
        Self {
            name: "five".to_string(),
            cuts: vec![
                (4.5, Recommendation::StrongBuy),
                (3.5, Recommendation::Buy),
                (2.5, Recommendation::Hold),
                (1.5, Recommendation::Sell),
            ],
            floor: Recommendation::StrongSell,
        }
    }

    /// Five-tier variant used by the dashboards: 4.0 / 3.5 / 2.5 / 2.0.
    pub fn five_tier_dashboard() -> Self {
        Self {
            name: "five_dashboard".to_string(),
            cuts: vec![
                (4.0, Recommendation::StrongBuy),
                (3.5, Recommendation::Buy),
                (2.5, Recommendation::Hold),
                (2.0, Recommendation::Sell),
            ],
            floor: Recommendation::StrongSell,
        }
    }

    /// Three-tier table: 3.5 BUY, 2.5 HOLD, otherwise SELL.
    pub fn three_tier() -> Self {
        Self {
            name: "three".to_string(),
            cuts: vec![(3.5, Recommendation::Buy), (2.5, Recommendation::Hold)],
            floor: Recommendation::Sell,
        }
    }

    /// Look up a built-in table by name.
    pub fn from_name(name: &str) -> Result<Self> {
        match name.trim().to_lowercase().as_str() {
            "five" | "five_tier" | "5" => Ok(Self::five_tier()),
            "five_dashboard" | "dashboard" => Ok(Self::five_tier_dashboard()),
            "three" | "three_tier" | "3" => Ok(Self::three_tier()),
            other => Err(Error::InvalidTierTable(format!(
                "unrecognized table '{}'",
                other
            ))),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cuts(&self) -> &[(f64, Recommendation)] {
        &self.cuts
    }

    pub fn classify(&self, overall: f64) -> Recommendation {
        self.cuts
            .iter()
            .find(|(cut, _)| overall >= *cut)
            .map(|(_, tier)| *tier)
            .unwrap_or(self.floor)
    }
}

impl Default for TierTable {
    fn default() -> Self {
        Self::five_tier()
    }
}

/// Combines category scores into one overall score and recommendation.
#[derive(Debug, Clone)]
pub struct CompositeScorer {
    weights: BTreeMap<Category, f64>,
    tiers: TierTable,
    sensitivity: f64,
}

impl CompositeScorer {
    pub fn new(weights: BTreeMap<Category, f64>, tiers: TierTable, sensitivity: f64) -> Self {
        Self {
            weights,
            tiers,
            sensitivity,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.weights.clone(),
            config.tier_table.clone(),
            config.target_sensitivity,
        )
    }

    /// Weighted arithmetic mean of `scores`.
    ///
    /// Categories missing from `weights` count with weight 1.0. An empty score
    /// map is neutral. A zero total weight, or any negative or non-finite
    /// weight, is a configuration error.
    pub fn combine(
        scores: &BTreeMap<Category, f64>,
        weights: &BTreeMap<Category, f64>,
    ) -> Result<f64> {
        if scores.is_empty() {
            return Ok(NEUTRAL_SCORE);
        }

        let mut weighted_sum = 0.0;
        let mut total_weight = 0.0;

        for (category, score) in scores {
            let weight = weights.get(category).copied().unwrap_or(1.0);
            if !weight.is_finite() || weight < 0.0 {
                return Err(Error::InvalidWeight {
                    category: category.to_string(),
                    weight,
                });
            }
            let score = if score.is_finite() { *score } else { NEUTRAL_SCORE };
            weighted_sum += score * weight;
            total_weight += weight;
        }

        if total_weight == 0.0 {
            return Err(Error::ZeroTotalWeight);
        }

        Ok(weighted_sum / total_weight)
    }

    pub fn classify(&self, overall: f64) -> Recommendation {
        self.tiers.classify(overall)
    }

    /// `price × (1 + (overall − 3) × k)`.
    pub fn target_price(&self, current_price: f64, overall: f64) -> f64 {
        current_price * (1.0 + (overall - NEUTRAL_SCORE) * self.sensitivity)
    }

    /// Combine, classify and derive a target price in one step.
    pub fn evaluate(&self, scores: &CategoryScores, current_price: f64) -> Result<CompositeScore> {
        let overall = Self::combine(&scores.values(), &self.weights)?;
        let recommendation = self.classify(overall);
        let target_price = self.target_price(current_price, overall);

        debug!(
            "Composite {:.2} -> {} (target {:.2} from {:.2})",
            overall, recommendation, target_price, current_price
        );

        Ok(CompositeScore {
            overall,
            recommendation,
            target_price,
            current_price,
        })
    }

    pub fn weights(&self) -> &BTreeMap<Category, f64> {
        &self.weights
    }

    pub fn tiers(&self) -> &TierTable {
        &self.tiers
    }
}
