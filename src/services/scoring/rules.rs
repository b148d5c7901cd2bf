//! Declarative rule table for factor scoring.
//!
//! Each rule is a predicate over [`FactorInputs`] plus a fixed adjustment to
//! one category. Rules are independent: every rule that applies is summed
//! onto the neutral base and the total is clamped once.

use crate::config::{Config, ScoringThresholds};
use crate::types::{Category, FundamentalMetadata};
use std::fmt;

/// Everything the rule table can look at for one ticker.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FactorInputs {
    /// Latest usable close.
    pub price: Option<f64>,
    pub ema_short: Option<f64>,
    pub ema_long: Option<f64>,
    pub sma_long: Option<f64>,
    /// SMA used as the market-trend reference.
    pub sma_trend: Option<f64>,
    pub rsi: Option<f64>,
    /// Annualized volatility, present only with at least two returns.
    pub volatility: Option<f64>,
    /// Max drawdown as a fraction (<= 0).
    pub max_drawdown: Option<f64>,
    /// Mean volume over the liquidity window.
    pub avg_volume: Option<f64>,
    pub metadata: Option<FundamentalMetadata>,
}

impl FactorInputs {
    /// A finite metadata field, if metadata was supplied.
    pub fn meta(&self, field: impl Fn(&FundamentalMetadata) -> Option<f64>) -> Option<f64> {
        FundamentalMetadata::finite(self.metadata.as_ref().and_then(field))
    }

    /// Sector tag, if any.
    pub fn sector(&self) -> Option<&str> {
        self.metadata.as_ref()?.sector.as_deref()
    }

    /// Investment themes, empty without metadata.
    pub fn themes(&self) -> &[String] {
        self.metadata.as_ref().map(|m| m.themes.as_slice()).unwrap_or(&[])
    }

    /// True when no price or metadata is available at all.
    pub fn is_unusable(&self) -> bool {
        self.price.is_none() && self.metadata.is_none()
    }
}

type Predicate = Box<dyn Fn(&FactorInputs, &ScoringThresholds) -> bool + Send + Sync>;

/// One (predicate, adjustment) entry of the rule table.
pub struct ScoreRule {
    id: String,
    category: Category,
    adjustment: f64,
    predicate: Predicate,
}

impl ScoreRule {
    pub fn new<F>(id: impl Into<String>, category: Category, adjustment: f64, predicate: F) -> Self
    where
        F: Fn(&FactorInputs, &ScoringThresholds) -> bool + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            category,
            adjustment,
            predicate: Box::new(predicate),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn adjustment(&self) -> f64 {
        self.adjustment
    }

    /// Whether the rule fires. Missing inputs never fire.
    pub fn applies(&self, inputs: &FactorInputs, thresholds: &ScoringThresholds) -> bool {
        (self.predicate)(inputs, thresholds)
    }
}

impl fmt::Debug for ScoreRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScoreRule")
            .field("id", &self.id)
            .field("category", &self.category)
            .field("adjustment", &self.adjustment)
            .finish()
    }
}

/// Ordered rule list plus the thresholds the predicates compare against.
#[derive(Debug)]
pub struct RuleTable {
    thresholds: ScoringThresholds,
    rules: Vec<ScoreRule>,
}

impl RuleTable {
    pub fn new(thresholds: ScoringThresholds, rules: Vec<ScoreRule>) -> Self {
        Self { thresholds, rules }
    }

    /// The standard rule set, with sector and theme bonuses from `config`.
    pub fn standard(config: &Config) -> Self {
        let mut rules = Vec::new();
        rules.extend(tech_rules());
        rules.extend(fund_rules());
        rules.extend(macro_rules(config));
        rules.extend(risk_rules());
        rules.extend(esg_rules());
        rules.extend(theme_rules(config));
        Self::new(config.thresholds.clone(), rules)
    }

    pub fn thresholds(&self) -> &ScoringThresholds {
        &self.thresholds
    }

    pub fn push(&mut self, rule: ScoreRule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[ScoreRule] {
        &self.rules
    }

    pub fn for_category(&self, category: Category) -> impl Iterator<Item = &ScoreRule> {
        self.rules.iter().filter(move |r| r.category == category)
    }

    /// Rules of `category` that fire for `inputs`, in table order.
    pub fn fired(&self, category: Category, inputs: &FactorInputs) -> Vec<&ScoreRule> {
        self.for_category(category)
            .filter(|r| r.applies(inputs, &self.thresholds))
            .collect()
    }
}

fn tech_rules() -> Vec<ScoreRule> {
    use Category::Tech;
    vec![
        ScoreRule::new("trend_stack", Tech, 1.0, |i, _| {
            matches!((i.price, i.ema_short, i.ema_long),
                (Some(p), Some(s), Some(l)) if p > s && s > l)
        }),
        ScoreRule::new("rsi_neutral", Tech, 0.5, |i, t| {
            i.rsi.is_some_and(|r| r >= t.rsi_oversold && r <= t.rsi_overbought)
        }),
        ScoreRule::new("rsi_overbought", Tech, -0.5, |i, t| {
            i.rsi.is_some_and(|r| r > t.rsi_overbought)
        }),
        ScoreRule::new("rsi_oversold", Tech, 0.5, |i, t| {
            i.rsi.is_some_and(|r| r < t.rsi_oversold)
        }),
        ScoreRule::new("above_long_sma", Tech, 0.5, |i, _| {
            matches!((i.price, i.sma_long), (Some(p), Some(s)) if p > s)
        }),
    ]
}

fn fund_rules() -> Vec<ScoreRule> {
    use Category::Fund;
    vec![
        ScoreRule::new("pe_cheap", Fund, 1.0, |i, t| {
            i.meta(|m| m.pe_ratio).is_some_and(|pe| pe > 0.0 && pe < t.pe_cheap)
        }),
        ScoreRule::new("pe_fair", Fund, 0.5, |i, t| {
            i.meta(|m| m.pe_ratio).is_some_and(|pe| pe >= t.pe_cheap && pe < t.pe_fair)
        }),
        ScoreRule::new("pe_expensive", Fund, -0.5, |i, t| {
            i.meta(|m| m.pe_ratio).is_some_and(|pe| pe >= t.pe_fair)
        }),
        ScoreRule::new("profit_margin_high", Fund, 1.0, |i, t| {
            i.meta(|m| m.profit_margin).is_some_and(|v| v > t.profit_margin_high)
        }),
        ScoreRule::new("profit_margin_moderate", Fund, 0.5, |i, t| {
            i.meta(|m| m.profit_margin)
                .is_some_and(|v| v > t.profit_margin_low && v <= t.profit_margin_high)
        }),
        ScoreRule::new("revenue_growth_high", Fund, 1.0, |i, t| {
            i.meta(|m| m.revenue_growth).is_some_and(|v| v > t.revenue_growth_high)
        }),
        ScoreRule::new("revenue_growth_moderate", Fund, 0.5, |i, t| {
            i.meta(|m| m.revenue_growth)
                .is_some_and(|v| v > t.revenue_growth_low && v <= t.revenue_growth_high)
        }),
        ScoreRule::new("gross_margin", Fund, 0.5, |i, t| {
            i.meta(|m| m.gross_margin).is_some_and(|v| v > t.gross_margin_min)
        }),
        ScoreRule::new("current_ratio", Fund, 0.5, |i, t| {
            i.meta(|m| m.current_ratio).is_some_and(|v| v > t.current_ratio_min)
        }),
    ]
}

fn macro_rules(config: &Config) -> Vec<ScoreRule> {
    use Category::Macro;
    let mut rules: Vec<ScoreRule> = config
        .sector_bonuses
        .iter()
        .map(|(sector, bonus)| {
            let wanted = sector.to_lowercase();
            ScoreRule::new(format!("sector:{}", sector), Macro, *bonus, move |i, _| {
                i.sector().is_some_and(|s| s.trim().to_lowercase() == wanted)
            })
        })
        .collect();

    rules.push(ScoreRule::new("large_cap", Macro, 0.5, |i, t| {
        i.meta(|m| m.market_cap).is_some_and(|v| v > t.large_cap)
    }));
    rules.push(ScoreRule::new("mid_cap", Macro, 0.3, |i, t| {
        i.meta(|m| m.market_cap).is_some_and(|v| v > t.mid_cap && v <= t.large_cap)
    }));
    rules.push(ScoreRule::new("above_trend_sma", Macro, 0.5, |i, _| {
        matches!((i.price, i.sma_trend), (Some(p), Some(s)) if p > s)
    }));
    rules
}

fn risk_rules() -> Vec<ScoreRule> {
    use Category::Risk;
    vec![
        ScoreRule::new("low_volatility", Risk, 1.0, |i, t| {
            i.volatility.is_some_and(|v| v < t.volatility_low)
        }),
        ScoreRule::new("moderate_volatility", Risk, 0.5, |i, t| {
            i.volatility
                .is_some_and(|v| v >= t.volatility_low && v < t.volatility_moderate)
        }),
        ScoreRule::new("high_volatility", Risk, -1.0, |i, t| {
            i.volatility.is_some_and(|v| v > t.volatility_high)
        }),
        ScoreRule::new("low_debt", Risk, 1.0, |i, t| {
            i.meta(|m| m.debt_ratio).is_some_and(|v| v < t.debt_low)
        }),
        ScoreRule::new("moderate_debt", Risk, 0.5, |i, t| {
            i.meta(|m| m.debt_ratio)
                .is_some_and(|v| v >= t.debt_low && v < t.debt_moderate)
        }),
        ScoreRule::new("high_debt", Risk, -1.0, |i, t| {
            i.meta(|m| m.debt_ratio).is_some_and(|v| v > t.debt_high)
        }),
        ScoreRule::new("shallow_drawdown", Risk, 0.5, |i, t| {
            i.max_drawdown.is_some_and(|d| d.abs() < t.drawdown_shallow)
        }),
        ScoreRule::new("deep_drawdown", Risk, -0.5, |i, t| {
            i.max_drawdown.is_some_and(|d| d.abs() > t.drawdown_deep)
        }),
        ScoreRule::new("liquid", Risk, 0.5, |i, t| {
            i.avg_volume.is_some_and(|v| v > t.liquidity_volume)
        }),
    ]
}

fn esg_rules() -> Vec<ScoreRule> {
    use Category::Esg;
    vec![
        ScoreRule::new("esg_leader", Esg, 2.0, |i, t| {
            i.meta(|m| m.esg_risk).is_some_and(|v| v <= t.esg_leader)
        }),
        ScoreRule::new("esg_good", Esg, 1.0, |i, t| {
            i.meta(|m| m.esg_risk).is_some_and(|v| v > t.esg_leader && v <= t.esg_good)
        }),
        ScoreRule::new("esg_laggard", Esg, -1.0, |i, t| {
            i.meta(|m| m.esg_risk).is_some_and(|v| v > t.esg_laggard)
        }),
    ]
}

fn theme_rules(config: &Config) -> Vec<ScoreRule> {
    config
        .theme_bonuses
        .iter()
        .map(|(theme, bonus)| {
            let wanted = theme.to_lowercase();
            ScoreRule::new(format!("theme:{}", theme), Category::Theme, *bonus, move |i, _| {
                i.themes().iter().any(|t| t.trim().to_lowercase() == wanted)
            })
        })
        .collect()
}
