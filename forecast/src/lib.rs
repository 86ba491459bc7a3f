//! Forecast - Leaderboard Rank-Prediction Engine
//!
//! Given a donor's place in a ranked leaderboard of donated energy, forecasts
//! what it takes to climb one rank (attack) and what it takes to hold the
//! current one (defense):
//!
//! - **Trend analysis**: slope of recent per-period donation totals
//! - **Gap calculation**: kWh distance to the rank above and below
//! - **Opponent momentum**: how likely a neighbor is to donate again
//! - **Probability estimation**: bounded overtake chance and overtake risk
//! - **Tip generation**: conservation actions ranked by kWh impact
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Forecaster                           │
//! │                                                             │
//! │  ┌─────────┐  ┌─────────┐  ┌──────────┐                    │
//! │  │  Trend  │  │   Gap   │  │ Momentum │                    │
//! │  └────┬────┘  └────┬────┘  └────┬─────┘                    │
//! │       └────────────┼────────────┘                           │
//! │              ┌─────▼───────┐    ┌──────┐                    │
//! │              │ Probability │────│ Tips │                    │
//! │              └─────────────┘    └──────┘                    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The engine is pure: it performs no I/O, holds no state between calls and
//! returns identical output for identical input.

pub mod config;
pub mod gap;
pub mod history;
pub mod leaderboard;
pub mod momentum;
pub mod prediction;
pub mod probability;
pub mod tips;
pub mod trend;
pub mod types;

// Re-export main types
pub use config::ForecastConfig;
pub use history::{HistorySource, Period, TrendSeries};
pub use leaderboard::{LeaderboardSnapshot, RankNeighbors};
pub use prediction::Forecaster;
pub use types::*;
