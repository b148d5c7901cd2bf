use crate::error::{Error, Result};
use crate::services::scoring::TierTable;
use crate::types::Category;
use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Lookback windows for the indicator engine.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorConfig {
    /// Short EMA span (default: 20).
    pub ema_short: usize,
    /// Long EMA span (default: 50).
    pub ema_long: usize,
    /// Long SMA window (default: 200).
    pub sma_long: usize,
    /// SMA window used as the market-trend reference (default: 50).
    pub sma_trend: usize,
    /// RSI period (default: 14).
    pub rsi_period: usize,
    /// Bollinger period (default: 20).
    pub bb_period: usize,
    /// Bollinger band width in standard deviations (default: 2.0).
    pub bb_std_dev: f64,
    /// ATR period (default: 14).
    pub atr_period: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            ema_short: 20,
            ema_long: 50,
            sma_long: 200,
            sma_trend: 50,
            rsi_period: 14,
            bb_period: 20,
            bb_std_dev: 2.0,
            atr_period: 14,
        }
    }
}

/// Thresholds used by the factor rule table. Ratios are fractions.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringThresholds {
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    /// P/E below this is cheap.
    pub pe_cheap: f64,
    /// P/E below this (and at least `pe_cheap`) is fair; at or above is expensive.
    pub pe_fair: f64,
    pub profit_margin_high: f64,
    pub profit_margin_low: f64,
    pub revenue_growth_high: f64,
    pub revenue_growth_low: f64,
    pub gross_margin_min: f64,
    pub current_ratio_min: f64,
    pub large_cap: f64,
    pub mid_cap: f64,
    /// Annualized volatility below this is low.
    pub volatility_low: f64,
    /// Annualized volatility below this (and at least `volatility_low`) is moderate.
    pub volatility_moderate: f64,
    /// Annualized volatility above this is high.
    pub volatility_high: f64,
    pub debt_low: f64,
    pub debt_moderate: f64,
    pub debt_high: f64,
    /// Drawdown magnitude below this is shallow.
    pub drawdown_shallow: f64,
    /// Drawdown magnitude above this is deep.
    pub drawdown_deep: f64,
    pub liquidity_volume: f64,
    pub liquidity_window: usize,
    pub esg_leader: f64,
    pub esg_good: f64,
    pub esg_laggard: f64,
}

impl Default for ScoringThresholds {
    fn default() -> Self {
        Self {
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
            pe_cheap: 20.0,
            pe_fair: 30.0,
            profit_margin_high: 0.15,
            profit_margin_low: 0.05,
            revenue_growth_high: 0.20,
            revenue_growth_low: 0.10,
            gross_margin_min: 0.20,
            current_ratio_min: 1.5,
            large_cap: 100e9,
            mid_cap: 10e9,
            volatility_low: 0.2,
            volatility_moderate: 0.4,
            volatility_high: 0.6,
            debt_low: 0.3,
            debt_moderate: 0.6,
            debt_high: 1.0,
            drawdown_shallow: 0.2,
            drawdown_deep: 0.5,
            liquidity_volume: 1_000_000.0,
            liquidity_window: 20,
            esg_leader: 20.0,
            esg_good: 30.0,
            esg_laggard: 40.0,
        }
    }
}

/// Signal history persistence and accuracy settings.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryConfig {
    /// History file (default: signal_history.json).
    pub path: PathBuf,
    /// Records kept per ticker (default: 100).
    pub max_records: usize,
    /// Backfill horizons in days (default: 1, 7, 30).
    pub horizons: Vec<u32>,
    /// Horizon used to judge accuracy (default: 7).
    pub accuracy_horizon: u32,
    /// HOLD counts as correct when |return| is below this percentage (default: 2.0).
    pub hold_band_pct: f64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("signal_history.json"),
            max_records: 100,
            horizons: vec![1, 7, 30],
            accuracy_horizon: 7,
            hold_band_pct: 2.0,
        }
    }
}

/// Scoring configuration, passed into the engine at call time.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub indicators: IndicatorConfig,
    pub thresholds: ScoringThresholds,
    /// MACRO bonus per favored sector (matched case-insensitively).
    pub sector_bonuses: BTreeMap<String, f64>,
    /// THEME bonus per investment theme (matched case-insensitively).
    pub theme_bonuses: BTreeMap<String, f64>,
    /// Category weights for the composite score.
    pub weights: BTreeMap<Category, f64>,
    pub tier_table: TierTable,
    /// Target price sensitivity `k` (default: 0.15).
    pub target_sensitivity: f64,
    pub history: HistoryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            indicators: IndicatorConfig::default(),
            thresholds: ScoringThresholds::default(),
            sector_bonuses: default_sector_bonuses(),
            theme_bonuses: default_theme_bonuses(),
            weights: default_weights(),
            tier_table: TierTable::five_tier(),
            target_sensitivity: 0.15,
            history: HistoryConfig::default(),
        }
    }
}

fn default_weights() -> BTreeMap<Category, f64> {
    BTreeMap::from([
        (Category::Tech, 1.0),
        (Category::Fund, 1.5),
        (Category::Macro, 1.0),
        (Category::Risk, 1.2),
        (Category::Esg, 0.8),
        (Category::Theme, 1.0),
    ])
}

fn default_sector_bonuses() -> BTreeMap<String, f64> {
    [
        ("Technology", 0.5),
        ("Communication Services", 0.5),
        ("Consumer Discretionary", 0.5),
        ("EV & Autonomous Driving", 0.5),
        ("Solar", 0.5),
        ("Satellite Communications", 0.5),
        ("eVTOL", 0.5),
        ("Space Infrastructure", 1.0),
        ("Lunar Exploration", 1.0),
    ]
    .into_iter()
    .map(|(s, b)| (s.to_string(), b))
    .collect()
}

fn default_theme_bonuses() -> BTreeMap<String, f64> {
    [
        ("EV", 0.5),
        ("Solar", 0.5),
        ("Space", 1.0),
        ("Nuclear", 1.0),
        ("eVTOL", 0.5),
        ("AI", 1.0),
        ("Cloud", 0.5),
    ]
    .into_iter()
    .map(|(t, b)| (t.to_string(), b))
    .collect()
}

impl Config {
    /// Load `.env` (if present) and then read configuration from the environment.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    /// Read configuration from `TIKER_*` environment variables, falling back to defaults.
    ///
    /// Unparsable numbers fall back to their default. Weight, bonus and tier
    /// table settings are validated and reported as configuration errors.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let ind = &defaults.indicators;

        let indicators = IndicatorConfig {
            ema_short: env_or("TIKER_EMA_SHORT", ind.ema_short),
            ema_long: env_or("TIKER_EMA_LONG", ind.ema_long),
            sma_long: env_or("TIKER_SMA_LONG", ind.sma_long),
            sma_trend: env_or("TIKER_SMA_TREND", ind.sma_trend),
            rsi_period: env_or("TIKER_RSI_PERIOD", ind.rsi_period),
            bb_period: env_or("TIKER_BB_PERIOD", ind.bb_period),
            bb_std_dev: env_or("TIKER_BB_STD_DEV", ind.bb_std_dev),
            atr_period: env_or("TIKER_ATR_PERIOD", ind.atr_period),
        };

        let weights = match env::var("TIKER_WEIGHTS") {
            Ok(list) => parse_weights(&list)?,
            Err(_) => defaults.weights,
        };

        let sector_bonuses = match env::var("TIKER_SECTOR_BONUSES") {
            Ok(list) => parse_bonuses(&list)?,
            Err(_) => defaults.sector_bonuses,
        };

        let theme_bonuses = match env::var("TIKER_THEME_BONUSES") {
            Ok(list) => parse_bonuses(&list)?,
            Err(_) => defaults.theme_bonuses,
        };

        let tier_table = match env::var("TIKER_TIER_TABLE") {
            Ok(name) => TierTable::from_name(&name)?,
            Err(_) => defaults.tier_table,
        };

        let hist = &defaults.history;
        let history = HistoryConfig {
            path: env::var("TIKER_HISTORY_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| hist.path.clone()),
            max_records: env_or("TIKER_HISTORY_MAX_RECORDS", hist.max_records),
            horizons: env::var("TIKER_HISTORY_HORIZONS")
                .ok()
                .map(|s| {
                    s.split(',')
                        .filter_map(|d| d.trim().parse().ok())
                        .collect::<Vec<u32>>()
                })
                .filter(|h| !h.is_empty())
                .unwrap_or_else(|| hist.horizons.clone()),
            accuracy_horizon: env_or("TIKER_ACCURACY_HORIZON", hist.accuracy_horizon),
            hold_band_pct: env_or("TIKER_HOLD_BAND_PCT", hist.hold_band_pct),
        };

        let config = Self {
            indicators,
            thresholds: defaults.thresholds,
            sector_bonuses,
            theme_bonuses,
            weights,
            tier_table,
            target_sensitivity: env_or("TIKER_TARGET_SENSITIVITY", defaults.target_sensitivity),
            history,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the weight table can produce a composite score.
    pub fn validate(&self) -> Result<()> {
        for (category, weight) in &self.weights {
            if !weight.is_finite() || *weight < 0.0 {
                return Err(Error::InvalidWeight {
                    category: category.to_string(),
                    weight: *weight,
                });
            }
        }
        if !self.weights.is_empty() && self.weights.values().sum::<f64>() == 0.0 {
            return Err(Error::ZeroTotalWeight);
        }
        if !self.target_sensitivity.is_finite() {
            return Err(Error::InvalidConfig(
                "target sensitivity must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Parse "TECH:1.0,FUND:1.5" into a weight table.
pub fn parse_weights(list: &str) -> Result<BTreeMap<Category, f64>> {
    let mut weights = BTreeMap::new();
    for (key, value) in parse_pairs(list)? {
        let category = Category::from_str(&key)
            .ok_or_else(|| Error::InvalidConfig(format!("unknown category '{}'", key)))?;
        weights.insert(category, value);
    }
    Ok(weights)
}

/// Parse "Solar:0.5,Space Infrastructure:1.0" into a bonus table.
pub fn parse_bonuses(list: &str) -> Result<BTreeMap<String, f64>> {
    Ok(parse_pairs(list)?.into_iter().collect())
}

fn parse_pairs(list: &str) -> Result<Vec<(String, f64)>> {
    list.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (key, value) = entry
                .rsplit_once(':')
                .ok_or_else(|| Error::InvalidConfig(format!("expected KEY:VALUE, got '{}'", entry)))?;
            let value: f64 = value
                .trim()
                .parse()
                .map_err(|_| Error::InvalidConfig(format!("invalid number in '{}'", entry)))?;
            Ok((key.trim().to_string(), value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights() {
        let config = Config::default();
        assert_eq!(config.weights.get(&Category::Fund), Some(&1.5));
        assert_eq!(config.weights.get(&Category::Esg), Some(&0.8));
        assert_eq!(config.weights.len(), 6);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_history_config() {
        let history = HistoryConfig::default();
        assert_eq!(history.max_records, 100);
        assert_eq!(history.horizons, vec![1, 7, 30]);
        assert_eq!(history.accuracy_horizon, 7);
    }

    #[test]
    fn test_parse_weights() {
        let weights = parse_weights("TECH:2.0, risk:0.5").unwrap();
        assert_eq!(weights.get(&Category::Tech), Some(&2.0));
        assert_eq!(weights.get(&Category::Risk), Some(&0.5));
        assert_eq!(weights.len(), 2);
    }

    #[test]
    fn test_parse_weights_rejects_unknown_category() {
        let err = parse_weights("TECH:1.0,SENTIMENT:1.0").unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_parse_weights_rejects_bad_number() {
        assert!(parse_weights("TECH:heavy").is_err());
        assert!(parse_weights("TECH").is_err());
    }

    #[test]
    fn test_parse_bonuses_keeps_spaces_in_names() {
        let bonuses = parse_bonuses("Space Infrastructure:1.0,Solar:0.5").unwrap();
        assert_eq!(bonuses.get("Space Infrastructure"), Some(&1.0));
    }

    #[test]
    fn test_validate_rejects_zero_weights() {
        let mut config = Config::default();
        for weight in config.weights.values_mut() {
            *weight = 0.0;
        }
        assert!(matches!(config.validate(), Err(Error::ZeroTotalWeight)));
    }

    #[test]
    fn test_validate_rejects_negative_weight() {
        let mut config = Config::default();
        config.weights.insert(Category::Tech, -1.0);
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidWeight { .. })
        ));
    }
}
