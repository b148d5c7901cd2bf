//! End-to-end analysis: series -> indicators + risk -> category scores -> composite.

use crate::config::Config;
use crate::error::Result;
use crate::services::history::SignalHistoryTracker;
use crate::services::risk::{RiskAssessor, RiskProfile};
use crate::services::scoring::{CompositeScorer, FactorScorer};
use crate::services::signals::IndicatorEngine;
use crate::types::{CategoryScores, CompositeScore, FundamentalMetadata, PriceSeries};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Result of analyzing one ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub ticker: String,
    /// Date of the last bar.
    pub as_of: Option<NaiveDate>,
    /// Latest usable close.
    pub current_price: Option<f64>,
    /// Latest value of every indicator column.
    pub indicators: BTreeMap<String, Option<f64>>,
    pub risk: RiskProfile,
    pub scores: CategoryScores,
    pub composite: CompositeScore,
}

/// One ticker of a portfolio passed in by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioEntry {
    pub ticker: String,
    pub series: PriceSeries,
    #[serde(default)]
    pub metadata: Option<FundamentalMetadata>,
}

/// Runs the full scoring pipeline. Holds configuration only, no portfolio state.
pub struct Analyzer {
    engine: IndicatorEngine,
    risk: RiskAssessor,
    factors: FactorScorer,
    composite: CompositeScorer,
}

impl Analyzer {
    pub fn new(
        engine: IndicatorEngine,
        risk: RiskAssessor,
        factors: FactorScorer,
        composite: CompositeScorer,
    ) -> Self {
        Self {
            engine,
            risk,
            factors,
            composite,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            IndicatorEngine::from_config(&config.indicators),
            RiskAssessor::default(),
            FactorScorer::from_config(config),
            CompositeScorer::from_config(config),
        )
    }

    /// Analyze one ticker.
    ///
    /// A series with no usable close scores neutral in every category.
    /// Only configuration problems (such as a zero total weight) are errors.
    pub fn analyze(
        &self,
        ticker: &str,
        series: &PriceSeries,
        metadata: Option<&FundamentalMetadata>,
    ) -> Result<Analysis> {
        debug!("Analyzing {} over {} bars", ticker, series.len());

        let indicators = self.engine.compute(series);
        let risk = self.risk.assess(series);
        let current_price = series.last_close();

        let scores = if current_price.is_none() {
            warn!("No usable close for {}; falling back to neutral scores", ticker);
            FactorScorer::neutral()
        } else {
            let inputs = self.factors.inputs_from(series, &indicators, &risk, metadata);
            self.factors.score(&inputs)
        };

        let composite = self
            .composite
            .evaluate(&scores, current_price.unwrap_or(0.0))?;

        Ok(Analysis {
            ticker: ticker.to_string(),
            as_of: series.last_date(),
            current_price,
            indicators: indicators.snapshot(),
            risk,
            scores,
            composite,
        })
    }

    /// Analyze every entry. Tickers are independent; a configuration error stops the run.
    pub fn analyze_portfolio(&self, portfolio: &[PortfolioEntry]) -> Result<Vec<Analysis>> {
        let analyses = portfolio
            .iter()
            .map(|entry| self.analyze(&entry.ticker, &entry.series, entry.metadata.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        info!("Analyzed {} tickers", analyses.len());
        Ok(analyses)
    }

    /// Analyze, backfill the ticker's earlier signals at the current price and
    /// append the new signal to `tracker`. The tracker is not saved.
    pub fn analyze_and_record(
        &self,
        tracker: &SignalHistoryTracker,
        ticker: &str,
        series: &PriceSeries,
        metadata: Option<&FundamentalMetadata>,
    ) -> Result<Analysis> {
        let analysis = self.analyze(ticker, series, metadata)?;

        if let Some(price) = analysis.current_price {
            tracker.backfill(ticker, price);
            tracker.record(
                ticker,
                analysis.composite.recommendation.as_str(),
                analysis.composite.overall,
                price,
                Some(record_metadata(&analysis)),
            );
        } else {
            warn!("Not recording {}: no usable price", ticker);
        }
        Ok(analysis)
    }

    pub fn engine(&self) -> &IndicatorEngine {
        &self.engine
    }

    pub fn composite(&self) -> &CompositeScorer {
        &self.composite
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Category scores and target price stored alongside a recorded signal.
fn record_metadata(analysis: &Analysis) -> Map<String, Value> {
    let mut metadata = Map::new();
    for score in analysis.scores.iter() {
        metadata.insert(score.category.tag().to_string(), Value::from(score.value));
    }
    metadata.insert(
        "target_price".to_string(),
        Value::from(analysis.composite.target_price),
    );
    metadata
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::services::signals::indicators::test_support::{closes, uptrend};
    use crate::types::{Category, Recommendation, NEUTRAL_SCORE};
    use tempfile::TempDir;

    #[test]
    fn test_empty_series_is_neutral() {
        let analysis = Analyzer::default()
            .analyze("EMPTY", &PriceSeries::default(), None)
            .unwrap();
        assert_eq!(analysis.current_price, None);
        assert_eq!(analysis.composite.overall, NEUTRAL_SCORE);
        assert_eq!(analysis.composite.recommendation, Recommendation::Hold);
        assert!(analysis.scores.iter().all(|s| s.value == NEUTRAL_SCORE));
    }

    #[test]
    fn test_all_bad_closes_is_neutral() {
        let analysis = Analyzer::default()
            .analyze("BAD", &closes(&[f64::NAN, -1.0, 0.0]), None)
            .unwrap();
        assert_eq!(analysis.composite.overall, NEUTRAL_SCORE);
    }

    #[test]
    fn test_zero_weights_surface_as_error() {
        let mut config = Config::default();
        for weight in config.weights.values_mut() {
            *weight = 0.0;
        }
        let err = Analyzer::from_config(&config)
            .analyze("X", &uptrend(30), None)
            .unwrap_err();
        assert!(matches!(err, Error::ZeroTotalWeight));
    }

    #[test]
    fn test_analysis_snapshot_and_scores() {
        let analysis = Analyzer::default().analyze("UP", &uptrend(60), None).unwrap();
        assert!(analysis.indicators.contains_key("EMA20"));
        assert_eq!(analysis.indicators.get("SMA200"), Some(&None));
        assert_eq!(analysis.scores.len(), 4);
        assert!(analysis.scores.value(Category::Tech).unwrap() > NEUTRAL_SCORE);
        assert_eq!(analysis.as_of, uptrend(60).last_date());
    }

    #[test]
    fn test_analyze_and_record_appends() {
        let dir = TempDir::new().unwrap();
        let tracker = SignalHistoryTracker::load(dir.path().join("h.json"));
        let analyzer = Analyzer::default();

        let analysis = analyzer
            .analyze_and_record(&tracker, "UP", &uptrend(60), None)
            .unwrap();
        let history = tracker.history("UP", None);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].signal, analysis.composite.recommendation.as_str());
        let metadata = history[0].metadata.as_ref().unwrap();
        assert!(metadata.contains_key("TECH"));
        assert!(metadata.contains_key("target_price"));
    }

    #[test]
    fn test_portfolio() {
        let portfolio = vec![
            PortfolioEntry {
                ticker: "A".to_string(),
                series: uptrend(40),
                metadata: None,
            },
            PortfolioEntry {
                ticker: "B".to_string(),
                series: closes(&[10.0; 10]),
                metadata: Some(FundamentalMetadata::default().with_sector("Solar")),
            },
        ];
        let analyses = Analyzer::default().analyze_portfolio(&portfolio).unwrap();
        assert_eq!(analyses.len(), 2);
        assert_eq!(analyses[1].ticker, "B");
        assert!(analyses[1].scores.get(Category::Macro).unwrap().fired.contains(&"sector:Solar".to_string()));
    }
}
