//! Core types for the forecast engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A donor as it appears in a leaderboard snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonorAccount {
    /// Donor identifier
    pub id: String,
    /// Display name
    pub display_name: String,
    /// Cumulative donated kWh for the current leaderboard scope
    pub total_kwh: f64,
    /// Monthly donation capacity (kWh)
    pub monthly_capacity_kwh: f64,
    /// 1-based rank within the snapshot
    pub rank: usize,
    /// When the current total was reached (tie-breaker, earliest wins)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reached_at: Option<DateTime<Utc>>,
}

impl DonorAccount {
    /// Create an unranked account. Ranks are assigned by the snapshot.
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, total_kwh: f64) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            total_kwh,
            monthly_capacity_kwh: 0.0,
            rank: 0,
            reached_at: None,
        }
    }

    /// Set monthly capacity.
    pub fn with_capacity(mut self, monthly_capacity_kwh: f64) -> Self {
        self.monthly_capacity_kwh = monthly_capacity_kwh;
        self
    }

    /// Set the instant the current total was reached.
    pub fn reached_at(mut self, at: DateTime<Utc>) -> Self {
        self.reached_at = Some(at);
        self
    }
}

/// A single recorded donation. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DonationEvent {
    /// Event identifier (assigned by the recorder)
    #[serde(default)]
    pub id: String,
    /// Donor identifier
    pub donor_id: String,
    /// When the donation happened
    pub timestamp: DateTime<Utc>,
    /// Donated energy (kWh, > 0)
    pub amount_kwh: f64,
    /// Free-form context
    #[serde(default)]
    pub context: String,
}

impl DonationEvent {
    /// Create a new event without an id.
    pub fn new(donor_id: impl Into<String>, timestamp: DateTime<Utc>, amount_kwh: f64) -> Self {
        Self {
            id: String::new(),
            donor_id: donor_id.into(),
            timestamp,
            amount_kwh,
            context: String::new(),
        }
    }
}

/// Classification of a donor's recent trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    /// Donations are growing
    Rising,
    /// Donations are flat
    Stable,
    /// Donations are shrinking
    Declining,
}

impl TrendDirection {
    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendDirection::Rising => "rising",
            TrendDirection::Stable => "stable",
            TrendDirection::Declining => "declining",
        }
    }
}

impl std::fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Priority tag of a conservation tip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TipPriority {
    /// Impact alone covers at least half of the outstanding target
    High,
    /// Everything else
    Low,
}

/// A quantified conservation action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tip {
    /// What to do
    pub action: String,
    /// Estimated monthly saving (kWh)
    pub estimated_kwh: f64,
    /// Priority relative to the outstanding target
    pub priority: TipPriority,
}

/// Attack-mode block: what it takes to overtake the donor ranked above.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatchUpBlock {
    /// kWh behind the donor above
    pub current_gap: f64,
    /// Smallest donation that produces a strict overtake
    pub min_required: f64,
    /// Donation needed if the target keeps donating at its usual rate
    pub max_needed: f64,
    /// Chance (0-100) of overtaking this period
    pub overtake_probability: u8,
    /// Target's momentum (0-100)
    pub competitor_momentum: u8,
    /// Subject's normalized trend (-1..1)
    pub user_trend: f64,
    /// Human-readable summary
    pub summary: String,
    /// Ranked conservation tips
    pub tips: Vec<Tip>,
}

/// Defense-mode block: what it takes to stay ahead of the donor ranked below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefenseBlock {
    /// kWh ahead of the donor below
    pub current_buffer: f64,
    /// Additional buffer recommended this period
    pub buffer_recommended: f64,
    /// Minimum recommended donation (equals `buffer_recommended`)
    pub min_required: f64,
    /// Recommended donation including the safety multiplier
    pub max_needed: f64,
    /// Chance (0-100) of being overtaken this period
    pub overtake_risk: u8,
    /// Chaser's momentum (0-100)
    pub chaser_momentum: u8,
    /// Subject's own donation consistency (0-100)
    pub sustainability_score: u8,
    /// Subject's normalized trend (-1..1)
    pub user_trend: f64,
    /// Human-readable summary
    pub summary: String,
    /// Ranked conservation tips
    pub tips: Vec<Tip>,
}

/// Where the subject sits in the leaderboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub is_top_ranked: bool,
    pub is_bottom_ranked: bool,
    pub has_competitor: bool,
    pub has_chaser: bool,
}

/// The engine's sole output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResult {
    /// Attack block, absent for the top-ranked donor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catch_up: Option<CatchUpBlock>,
    /// Defense block, absent for the bottom-ranked donor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defense: Option<DefenseBlock>,
    /// Position flags
    pub position: Position,
}

/// Error types for the forecast engine.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ForecastError {
    /// Subject donor is not part of the snapshot
    #[error("Donor not found: {0}")]
    NotFound(String),

    /// Input data failed validation
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ForecastError>;
