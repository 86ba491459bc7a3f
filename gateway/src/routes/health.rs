//! Health check endpoints
//!
//! `/health` and `/healthz` are liveness probes: they return 200 while the
//! process is serving, with store and cache figures for information.

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;

use forecast::Period;

use crate::cache::CacheStats;
use crate::routes::json_response;
use crate::server::AppState;
use crate::store::Scope;

/// Health response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Overall health status (true if service is running)
    pub healthy: bool,
    /// Service version
    pub version: &'static str,
    /// Seconds since start
    pub uptime_secs: u64,
    /// Registered donors
    pub donors: usize,
    /// Leaderboard scope in use
    pub scope: Scope,
    /// History bucket size in use
    pub history_period: Period,
    /// Prediction cache figures
    pub cache: CacheHealth,
    /// Current timestamp
    pub timestamp: String,
}

/// Prediction cache figures
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheHealth {
    #[serde(flatten)]
    pub stats: CacheStats,
    pub hit_rate: f64,
}

async fn build_health_response(state: &AppState) -> HealthResponse {
    let stats = state.cache.stats();
    HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.started_at.elapsed().as_secs(),
        donors: state.store.donor_count().await,
        scope: state.args.leaderboard_scope,
        history_period: state.args.history_period,
        cache: CacheHealth {
            hit_rate: stats.hit_rate(),
            stats,
        },
        timestamp: chrono::Utc::now().to_rfc3339(),
    }
}

/// Handle liveness probe (/health, /healthz)
pub async fn health_check(state: &AppState) -> Response<Full<Bytes>> {
    let response = build_health_response(state).await;
    json_response(StatusCode::OK, &response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_serialization() {
        let health = HealthResponse {
            healthy: true,
            version: "0.1.0",
            uptime_secs: 12,
            donors: 3,
            scope: Scope::Month,
            history_period: Period::Weekly,
            cache: CacheHealth {
                stats: CacheStats {
                    entries: 1,
                    hits: 3,
                    misses: 1,
                    evictions: 0,
                },
                hit_rate: 75.0,
            },
            timestamp: "2024-01-01T00:00:00Z".to_string(),
        };

        let json = serde_json::to_value(&health).unwrap();
        assert_eq!(json["scope"], "month");
        assert_eq!(json["historyPeriod"], "weekly");
        assert_eq!(json["cache"]["hits"], 3);
        assert_eq!(json["cache"]["hitRate"], 75.0);
        assert_eq!(json["uptimeSecs"], 12);
    }
}
