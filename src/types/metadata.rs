use serde::{Deserialize, Serialize};

/// Optional fundamental and classification data supplied with a series.
///
/// Ratios are fractions (`0.15` is 15%). Any field may be missing; rules that
/// depend on a missing field simply do not fire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FundamentalMetadata {
    pub pe_ratio: Option<f64>,
    pub revenue_growth: Option<f64>,
    pub gross_margin: Option<f64>,
    pub profit_margin: Option<f64>,
    /// Debt to equity, as a fraction.
    pub debt_ratio: Option<f64>,
    pub current_ratio: Option<f64>,
    pub market_cap: Option<f64>,
    pub sector: Option<String>,
    /// Sustainability risk rating; lower is better.
    pub esg_risk: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub themes: Vec<String>,
}

impl FundamentalMetadata {
    pub fn with_sector(mut self, sector: impl Into<String>) -> Self {
        self.sector = Some(sector.into());
        self
    }

    pub fn with_theme(mut self, theme: impl Into<String>) -> Self {
        self.themes.push(theme.into());
        self
    }

    /// Finite value of an optional field.
    pub(crate) fn finite(value: Option<f64>) -> Option<f64> {
        value.filter(|v| v.is_finite())
    }
}
