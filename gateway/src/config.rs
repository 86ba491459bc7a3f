//! Configuration for the gateway
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use forecast::{ForecastConfig, Period};

use crate::cache::CacheConfig;
use crate::store::Scope;
use crate::types::{GatewayError, Result};

/// Gateway - HTTP front end for leaderboard rank predictions
#[derive(Parser, Debug, Clone)]
#[command(name = "gateway")]
#[command(about = "Serves attack and defense forecasts for the energy donation leaderboard")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// JSON seed file with donors and donations
    #[arg(long, env = "DATA_FILE")]
    pub data_file: Option<PathBuf>,

    /// YAML file overriding forecast model constants
    #[arg(long, env = "FORECAST_CONFIG")]
    pub forecast_config: Option<PathBuf>,

    /// Bucket size for donation history (weekly, monthly)
    #[arg(long, env = "HISTORY_PERIOD", default_value = "weekly")]
    pub history_period: Period,

    /// Donations counted toward leaderboard totals (all-time, year, month)
    #[arg(long, env = "LEADERBOARD_SCOPE", default_value = "all-time")]
    pub leaderboard_scope: Scope,

    /// How long a cached prediction stays fresh
    #[arg(long, env = "PREDICTION_CACHE_TTL_SECS", default_value = "300")]
    pub prediction_cache_ttl_secs: u64,

    /// Maximum number of cached predictions
    #[arg(long, env = "PREDICTION_CACHE_MAX_ENTRIES", default_value = "10000")]
    pub prediction_cache_max_entries: usize,

    /// Interval between expired-entry sweeps
    #[arg(long, env = "CACHE_CLEANUP_INTERVAL_SECS", default_value = "60")]
    pub cache_cleanup_interval_secs: u64,
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.prediction_cache_max_entries == 0 {
            return Err("PREDICTION_CACHE_MAX_ENTRIES must be at least 1".to_string());
        }
        if self.cache_cleanup_interval_secs == 0 {
            return Err("CACHE_CLEANUP_INTERVAL_SECS must be at least 1".to_string());
        }
        if let Some(path) = &self.data_file {
            if !path.exists() {
                return Err(format!("DATA_FILE {} does not exist", path.display()));
            }
        }
        Ok(())
    }

    /// Prediction cache settings
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            max_entries: self.prediction_cache_max_entries,
            ttl: Duration::from_secs(self.prediction_cache_ttl_secs),
            cleanup_interval: Duration::from_secs(self.cache_cleanup_interval_secs),
        }
    }

    /// Load forecast constants, falling back to defaults when no file is set
    pub fn load_forecast_config(&self) -> Result<ForecastConfig> {
        match &self.forecast_config {
            Some(path) => {
                let yaml = std::fs::read_to_string(path).map_err(|e| {
                    GatewayError::Config(format!("cannot read {}: {}", path.display(), e))
                })?;
                Ok(ForecastConfig::from_yaml(&yaml)?)
            }
            None => Ok(ForecastConfig::default()),
        }
    }
}
