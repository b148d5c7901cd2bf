use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Lowest possible category or composite score.
pub const MIN_SCORE: f64 = 1.0;
/// Highest possible category or composite score.
pub const MAX_SCORE: f64 = 5.0;
/// Neutral score every category starts from.
pub const NEUTRAL_SCORE: f64 = 3.0;

/// Clamp a raw score into `[MIN_SCORE, MAX_SCORE]`. Non-finite input is neutral.
pub fn clamp_score(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(MIN_SCORE, MAX_SCORE)
    } else {
        NEUTRAL_SCORE
    }
}

/// Expert scoring category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Category {
    Tech,
    Fund,
    Macro,
    Risk,
    Esg,
    Theme,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Tech,
        Category::Fund,
        Category::Macro,
        Category::Risk,
        Category::Esg,
        Category::Theme,
    ];

    /// Parse from a tag such as "TECH" or "tech".
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "TECH" => Some(Self::Tech),
            "FUND" => Some(Self::Fund),
            "MACRO" => Some(Self::Macro),
            "RISK" => Some(Self::Risk),
            "ESG" => Some(Self::Esg),
            "THEME" => Some(Self::Theme),
            _ => None,
        }
    }

    /// Upper-case tag used in reports and persisted data.
    pub fn tag(&self) -> &'static str {
        match self {
            Category::Tech => "TECH",
            Category::Fund => "FUND",
            Category::Macro => "MACRO",
            Category::Risk => "RISK",
            Category::Esg => "ESG",
            Category::Theme => "THEME",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A single category score in `[1.0, 5.0]` with the rules that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub category: Category,
    pub value: f64,
    /// Ids of the rules that fired, in evaluation order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fired: Vec<String>,
}

impl CategoryScore {
    /// Build a score from a raw sum; the value is clamped once here.
    pub fn new(category: Category, raw: f64, fired: Vec<String>) -> Self {
        Self {
            category,
            value: clamp_score(raw),
            fired,
        }
    }

    pub fn neutral(category: Category) -> Self {
        Self::new(category, NEUTRAL_SCORE, Vec::new())
    }

    /// Distance from the neutral score, as shown next to each category in reports.
    pub fn delta(&self) -> f64 {
        self.value - NEUTRAL_SCORE
    }
}

/// Category scores keyed by category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryScores {
    scores: BTreeMap<Category, CategoryScore>,
}

impl CategoryScores {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, score: CategoryScore) {
        self.scores.insert(score.category, score);
    }

    pub fn get(&self, category: Category) -> Option<&CategoryScore> {
        self.scores.get(&category)
    }

    pub fn value(&self, category: Category) -> Option<f64> {
        self.scores.get(&category).map(|s| s.value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CategoryScore> {
        self.scores.values()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Plain category → value mapping used by the composite scorer.
    pub fn values(&self) -> BTreeMap<Category, f64> {
        self.scores.iter().map(|(c, s)| (*c, s.value)).collect()
    }
}

impl FromIterator<CategoryScore> for CategoryScores {
    fn from_iter<I: IntoIterator<Item = CategoryScore>>(iter: I) -> Self {
        let mut scores = Self::new();
        for score in iter {
            scores.insert(score);
        }
        scores
    }
}

/// Broad direction of a recommendation, used when judging accuracy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalFamily {
    Bullish,
    Neutral,
    Bearish,
}

/// Discrete recommendation tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    StrongBuy,
    Buy,
    Hold,
    Sell,
    StrongSell,
}

impl Recommendation {
    pub const ALL: [Recommendation; 5] = [
        Recommendation::StrongBuy,
        Recommendation::Buy,
        Recommendation::Hold,
        Recommendation::Sell,
        Recommendation::StrongSell,
    ];

    /// Parse from the persisted form ("STRONG_BUY", "buy", ...).
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "STRONG_BUY" => Some(Self::StrongBuy),
            "BUY" => Some(Self::Buy),
            "HOLD" => Some(Self::Hold),
            "SELL" => Some(Self::Sell),
            "STRONG_SELL" => Some(Self::StrongSell),
            _ => None,
        }
    }

    /// Persisted string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::StrongBuy => "STRONG_BUY",
            Recommendation::Buy => "BUY",
            Recommendation::Hold => "HOLD",
            Recommendation::Sell => "SELL",
            Recommendation::StrongSell => "STRONG_SELL",
        }
    }

    /// Get display label for this tier.
    pub fn label(&self) -> &'static str {
        match self {
            Recommendation::StrongBuy => "Strong Buy",
            Recommendation::Buy => "Buy",
            Recommendation::Hold => "Hold",
            Recommendation::Sell => "Sell",
            Recommendation::StrongSell => "Strong Sell",
        }
    }

    pub fn family(&self) -> SignalFamily {
        match self {
            Recommendation::StrongBuy | Recommendation::Buy => SignalFamily::Bullish,
            Recommendation::Hold => SignalFamily::Neutral,
            Recommendation::Sell | Recommendation::StrongSell => SignalFamily::Bearish,
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Overall decision for one analysis call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeScore {
    /// Weighted mean of the category scores.
    pub overall: f64,
    pub recommendation: Recommendation,
    /// Linear extrapolation around the neutral score.
    pub target_price: f64,
    /// Price the target was derived from.
    pub current_price: f64,
}

impl CompositeScore {
    /// Upside (or downside) to the target in percent.
    pub fn upside_pct(&self) -> Option<f64> {
        (self.current_price > 0.0)
            .then(|| (self.target_price - self.current_price) / self.current_price * 100.0)
    }
}
