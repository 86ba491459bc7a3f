//! Per-donor endpoints
//!
//! - `GET /api/users/{id}/position` - rank plus distance to the top five
//! - `GET /api/users/{id}/previous` - the donor ranked directly above
//! - `GET /api/users/{id}/electricity` - monthly capacity usage

use bytes::Bytes;
use chrono::Utc;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;

use forecast::{DonorAccount, LeaderboardSnapshot};

use crate::routes::{error_response, json_response};
use crate::server::AppState;
use crate::types::{GatewayError, Result};

/// Ranks that count as "top five"
const TOP_N: usize = 5;

/// Margin added on top of the fifth donor's total
const TOP_N_MARGIN_KWH: f64 = 0.1;

/// Position payload
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionResponse {
    pub donor_id: String,
    pub display_name: String,
    pub rank: usize,
    pub total_kwh: f64,
    pub donor_count: usize,
    pub kwh_needed_for_top5: f64,
}

/// kWh a donor must add to enter the top five, 0 when already inside.
pub fn kwh_needed_for_top_n(snapshot: &LeaderboardSnapshot, account: &DonorAccount) -> f64 {
    if account.rank <= TOP_N {
        return 0.0;
    }
    snapshot
        .at_rank(TOP_N)
        .map(|cutoff| (cutoff.total_kwh - account.total_kwh + TOP_N_MARGIN_KWH).max(0.0).ceil())
        .unwrap_or(0.0)
}

async fn ranked_snapshot(state: &AppState) -> Result<LeaderboardSnapshot> {
    state
        .store
        .snapshot(state.args.leaderboard_scope, Utc::now())
        .await
}

/// Handle `GET /api/users/{id}/position`
pub async fn handle_position(state: &AppState, donor_id: &str) -> Response<Full<Bytes>> {
    let snapshot = match ranked_snapshot(state).await {
        Ok(s) => s,
        Err(e) => return error_response(e),
    };
    let Some(account) = snapshot.find(donor_id) else {
        return error_response(GatewayError::NotFound(format!("donor {}", donor_id)));
    };

    json_response(
        StatusCode::OK,
        &PositionResponse {
            donor_id: account.id.clone(),
            display_name: account.display_name.clone(),
            rank: account.rank,
            total_kwh: account.total_kwh,
            donor_count: snapshot.len(),
            kwh_needed_for_top5: kwh_needed_for_top_n(&snapshot, account),
        },
    )
}

/// Handle `GET /api/users/{id}/previous`
pub async fn handle_previous(state: &AppState, donor_id: &str) -> Response<Full<Bytes>> {
    let snapshot = match ranked_snapshot(state).await {
        Ok(s) => s,
        Err(e) => return error_response(e),
    };
    match snapshot.neighbors(donor_id) {
        Ok(neighbors) => match neighbors.above {
            Some(above) => json_response(StatusCode::OK, above),
            None => error_response(GatewayError::NotFound("no one ahead".to_string())),
        },
        Err(e) => error_response(e.into()),
    }
}

/// Handle `GET /api/users/{id}/electricity`
pub async fn handle_electricity(state: &AppState, donor_id: &str) -> Response<Full<Bytes>> {
    match state.store.monthly_usage(donor_id, Utc::now()).await {
        Ok(usage) => json_response(StatusCode::OK, &usage),
        Err(e) => error_response(e),
    }
}
