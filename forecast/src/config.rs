//! Configuration for the forecast engine.
//!
//! Every tunable constant of the heuristic model lives here so deployments can
//! override it from YAML without touching code.

use serde::{Deserialize, Serialize};

use crate::types::{ForecastError, Result};

/// Configuration for a [`crate::Forecaster`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Trend analyzer configuration
    pub trend: TrendConfig,
    /// Gap calculator configuration
    pub gap: GapConfig,
    /// Momentum estimator configuration
    pub momentum: MomentumConfig,
    /// Probability estimator configuration
    pub probability: ProbabilityConfig,
    /// Tip generator configuration
    pub tips: TipConfig,
    /// Summary wording thresholds
    pub summary: SummaryConfig,
}

impl ForecastConfig {
    /// Load config from YAML. Missing sections fall back to defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self =
            serde_yaml::from_str(yaml).map_err(|e| ForecastError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| ForecastError::Config(e.to_string()))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.trend.window == 0 {
            return Err(ForecastError::Config("trend.window must be at least 1".into()));
        }
        if self.trend.declining_threshold > self.trend.rising_threshold {
            return Err(ForecastError::Config(
                "trend.declining_threshold must not exceed trend.rising_threshold".into(),
            ));
        }
        if !(self.gap.epsilon_kwh > 0.0) {
            return Err(ForecastError::Config("gap.epsilon_kwh must be positive".into()));
        }
        if !(self.gap.defense_safety_multiplier >= 1.0) {
            return Err(ForecastError::Config(
                "gap.defense_safety_multiplier must be at least 1.0".into(),
            ));
        }
        if self.momentum.window == 0 {
            return Err(ForecastError::Config("momentum.window must be at least 1".into()));
        }
        if !(self.momentum.decay > 0.0 && self.momentum.decay <= 1.0) {
            return Err(ForecastError::Config("momentum.decay must be in (0, 1]".into()));
        }
        if !(self.tips.high_priority_share > 0.0 && self.tips.high_priority_share <= 1.0) {
            return Err(ForecastError::Config(
                "tips.high_priority_share must be in (0, 1]".into(),
            ));
        }
        if !(self.tips.reference_capacity_kwh > 0.0) {
            return Err(ForecastError::Config(
                "tips.reference_capacity_kwh must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Trend analyzer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    /// Number of most recent periods used for the regression
    pub window: usize,
    /// Normalized slope above which a trend is Rising
    pub rising_threshold: f64,
    /// Normalized slope below which a trend is Declining
    pub declining_threshold: f64,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            window: 6,
            rising_threshold: 0.1,
            declining_threshold: -0.1,
        }
    }
}

/// Gap calculator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GapConfig {
    /// Smallest meaningful donation unit (kWh)
    pub epsilon_kwh: f64,
    /// Multiplier applied to the recommended defense buffer
    pub defense_safety_multiplier: f64,
}

impl Default for GapConfig {
    fn default() -> Self {
        Self {
            epsilon_kwh: 0.01,
            defense_safety_multiplier: 1.5,
        }
    }
}

/// Opponent momentum configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MomentumConfig {
    /// Number of most recent periods considered
    pub window: usize,
    /// Weight multiplier per period of age (most recent period weighs 1.0)
    pub decay: f64,
}

impl Default for MomentumConfig {
    fn default() -> Self {
        Self {
            window: 8,
            decay: 0.7,
        }
    }
}

/// Probability estimator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbabilityConfig {
    /// Starting point for both scores
    pub base: f64,
    /// Weight of own trend (x100) on overtake probability
    pub trend_weight: f64,
    /// Weight of gap or buffer relative to own average period donation
    pub gap_weight: f64,
    /// Weight of competitor momentum on overtake probability
    pub competitor_momentum_weight: f64,
    /// Weight of chaser momentum on overtake risk
    pub chaser_momentum_weight: f64,
    /// Weight of a declining own trend (x100) on overtake risk
    pub declining_trend_weight: f64,
}

impl Default for ProbabilityConfig {
    fn default() -> Self {
        Self {
            base: 50.0,
            trend_weight: 0.3,
            gap_weight: 20.0,
            competitor_momentum_weight: 0.3,
            chaser_momentum_weight: 0.4,
            declining_trend_weight: 0.2,
        }
    }
}

/// Tip generator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TipConfig {
    /// Share of the outstanding target a tip must cover to be `high` priority
    pub high_priority_share: f64,
    /// Monthly capacity of the household the catalog impacts were measured on
    pub reference_capacity_kwh: f64,
    /// Upper bound on the capacity scale factor
    pub max_scale: f64,
    /// Optional cap on the number of tips returned
    pub max_tips: Option<usize>,
}

impl Default for TipConfig {
    fn default() -> Self {
        Self {
            high_priority_share: 0.5,
            reference_capacity_kwh: 300.0,
            max_scale: 2.0,
            max_tips: None,
        }
    }
}

/// Thresholds that pick the summary wording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    /// Gap (kWh) under which the target is "so close"
    pub close_gap_kwh: f64,
    /// Gap (kWh) under which the target is "within reach"
    pub reachable_gap_kwh: f64,
    /// Buffer (kWh) under which the lead is "narrow"
    pub narrow_buffer_kwh: f64,
    /// Buffer (kWh) under which the lead is "moderate"
    pub moderate_buffer_kwh: f64,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            close_gap_kwh: 10.0,
            reachable_gap_kwh: 30.0,
            narrow_buffer_kwh: 5.0,
            moderate_buffer_kwh: 15.0,
        }
    }
}
