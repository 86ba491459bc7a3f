//! Gateway - HTTP front end for the leaderboard rank-prediction engine
//!
//! Keeps donors and their donation events in memory, derives leaderboard
//! snapshots and trend series from them, and serves forecasts from the
//! [`forecast`] engine with a per-donor response cache.

pub mod cache;
pub mod config;
pub mod routes;
pub mod server;
pub mod store;
pub mod types;

pub use config::Args;
pub use server::{dispatch, run, AppState};
pub use store::{DonationStore, Scope};
pub use types::{GatewayError, Result};
