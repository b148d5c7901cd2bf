//! Factor scoring: indicator and risk outputs plus metadata to category scores.

use super::rules::{FactorInputs, RuleTable};
use crate::config::{Config, IndicatorConfig};
use crate::services::risk::RiskProfile;
use crate::services::signals::indicators::{ema_name, rsi_name, sma_name};
use crate::types::{
    Category, CategoryScore, CategoryScores, FundamentalMetadata, IndicatorSet, PriceSeries,
    NEUTRAL_SCORE,
};
use tracing::debug;

/// Turns [`FactorInputs`] into per-category scores using a [`RuleTable`].
#[derive(Debug)]
pub struct FactorScorer {
    indicators: IndicatorConfig,
    liquidity_window: usize,
    rules: RuleTable,
}

impl FactorScorer {
    pub fn new(indicators: IndicatorConfig, liquidity_window: usize, rules: RuleTable) -> Self {
        Self {
            indicators,
            liquidity_window,
            rules,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.indicators.clone(),
            config.thresholds.liquidity_window,
            RuleTable::standard(config),
        )
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    /// Collect the latest indicator values, risk metrics and metadata.
    pub fn inputs_from(
        &self,
        series: &PriceSeries,
        indicators: &IndicatorSet,
        risk: &RiskProfile,
        metadata: Option<&FundamentalMetadata>,
    ) -> FactorInputs {
        let cfg = &self.indicators;
        FactorInputs {
            price: series.last_close(),
            ema_short: indicators.latest(&ema_name(cfg.ema_short)),
            ema_long: indicators.latest(&ema_name(cfg.ema_long)),
            sma_long: indicators.latest(&sma_name(cfg.sma_long)),
            sma_trend: indicators.latest(&sma_name(cfg.sma_trend)),
            rsi: indicators.latest(&rsi_name(cfg.rsi_period)),
            volatility: risk.has_volatility().then_some(risk.volatility),
            max_drawdown: (risk.sample_size > 0).then_some(risk.max_drawdown),
            avg_volume: self.average_volume(series),
            metadata: metadata.cloned(),
        }
    }

    /// Mean volume over the trailing liquidity window, if every bar in it is usable.
    fn average_volume(&self, series: &PriceSeries) -> Option<f64> {
        let window = self.liquidity_window;
        if window == 0 || series.len() < window {
            return None;
        }
        let volumes = series.volumes();
        let recent: Option<Vec<f64>> = volumes[volumes.len() - window..].iter().copied().collect();
        recent.map(|v| v.iter().sum::<f64>() / window as f64)
    }

    /// Categories scored for these inputs. ESG and THEME need their metadata.
    pub fn categories(inputs: &FactorInputs) -> Vec<Category> {
        let mut categories = vec![Category::Tech, Category::Fund, Category::Macro, Category::Risk];
        if inputs.meta(|m| m.esg_risk).is_some() {
            categories.push(Category::Esg);
        }
        if !inputs.themes().is_empty() {
            categories.push(Category::Theme);
        }
        categories
    }

    /// Neutral base plus every fired adjustment, clamped once.
    pub fn score_category(&self, category: Category, inputs: &FactorInputs) -> CategoryScore {
        let fired = self.rules.fired(category, inputs);
        let raw = NEUTRAL_SCORE + fired.iter().map(|r| r.adjustment()).sum::<f64>();
        CategoryScore::new(
            category,
            raw,
            fired.iter().map(|r| r.id().to_string()).collect(),
        )
    }

    /// Score every applicable category.
    pub fn score(&self, inputs: &FactorInputs) -> CategoryScores {
        if inputs.is_unusable() {
            debug!("No usable price or metadata; scoring neutral");
            return Self::neutral();
        }

        let scores: CategoryScores = Self::categories(inputs)
            .into_iter()
            .map(|category| self.score_category(category, inputs))
            .collect();

        for score in scores.iter() {
            debug!("{} = {:.2} ({:?})", score.category, score.value, score.fired);
        }
        scores
    }

    /// Neutral scores for the four core categories.
    pub fn neutral() -> CategoryScores {
        [Category::Tech, Category::Fund, Category::Macro, Category::Risk]
            .into_iter()
            .map(CategoryScore::neutral)
            .collect()
    }
}
