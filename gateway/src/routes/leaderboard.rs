//! Leaderboard endpoint

use bytes::Bytes;
use chrono::Utc;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;

use forecast::DonorAccount;

use crate::routes::{error_response, json_response};
use crate::server::AppState;
use crate::store::Scope;

/// Ranked leaderboard payload
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardResponse {
    pub scope: Scope,
    pub generated_at: String,
    pub leaderboard: Vec<DonorAccount>,
}

/// Handle `GET /api/leaderboard`
pub async fn handle_leaderboard(state: &AppState) -> Response<Full<Bytes>> {
    let now = Utc::now();
    match state.store.snapshot(state.args.leaderboard_scope, now).await {
        Ok(snapshot) => json_response(
            StatusCode::OK,
            &LeaderboardResponse {
                scope: state.args.leaderboard_scope,
                generated_at: now.to_rfc3339(),
                leaderboard: snapshot.accounts().to_vec(),
            },
        ),
        Err(e) => error_response(e),
    }
}
