//! Prediction endpoint
//!
//! `GET /predict/{donor_id}` returns the attack/defense forecast for a donor.
//! Responses are cached per donor and carry an ETag; a matching
//! `If-None-Match` yields 304. `?refresh=true` bypasses the cache.

use bytes::Bytes;
use chrono::Utc;
use http_body_util::Full;
use hyper::header::{HeaderValue, CACHE_CONTROL, ETAG};
use hyper::{Response, StatusCode};
use tracing::debug;

use crate::cache::CacheEntry;
use crate::routes::{error_response, json_bytes_response};
use crate::server::AppState;
use crate::types::{GatewayError, Result};

/// Handle a prediction request
pub async fn handle_predict(
    state: &AppState,
    donor_id: &str,
    query: Option<&str>,
    if_none_match: Option<&str>,
) -> Response<Full<Bytes>> {
    if !wants_refresh(query) {
        if let Some(entry) = state.cache.get(donor_id) {
            return cached_response(&entry, if_none_match, "HIT");
        }
    }

    let generation = state.cache.generation();
    match compute_prediction(state, donor_id).await {
        Ok(data) => {
            let entry = state.cache.set(donor_id, data, generation);
            cached_response(&entry, if_none_match, "MISS")
        }
        Err(e) => error_response(e),
    }
}

/// Build the snapshot and history the engine needs, then run it
async fn compute_prediction(state: &AppState, donor_id: &str) -> Result<Vec<u8>> {
    let now = Utc::now();
    let snapshot = state
        .store
        .snapshot(state.args.leaderboard_scope, now)
        .await?;
    let neighbors = snapshot.neighbors(donor_id)?;

    let mut ids = vec![neighbors.subject.id.as_str()];
    ids.extend(neighbors.above.map(|a| a.id.as_str()));
    ids.extend(neighbors.below.map(|b| b.id.as_str()));
    let history = state
        .store
        .histories(&ids, state.args.history_period, now)
        .await?;

    let result = state.forecaster.predict(donor_id, &snapshot, &history)?;
    debug!(donor_id = %donor_id, rank = neighbors.subject.rank, "Computed prediction");

    serde_json::to_vec(&result)
        .map_err(|e| GatewayError::Internal(format!("failed to serialize prediction: {}", e)))
}

fn cached_response(
    entry: &CacheEntry,
    if_none_match: Option<&str>,
    cache_status: &'static str,
) -> Response<Full<Bytes>> {
    let mut response = if if_none_match.is_some_and(|h| etag_matches(h, &entry.etag)) {
        let mut not_modified = Response::new(Full::new(Bytes::new()));
        *not_modified.status_mut() = StatusCode::NOT_MODIFIED;
        not_modified
    } else {
        json_bytes_response(StatusCode::OK, entry.data.clone())
    };

    let headers = response.headers_mut();
    if let Ok(etag) = HeaderValue::from_str(&entry.etag) {
        headers.insert(ETAG, etag);
    }
    if let Ok(cache_control) =
        HeaderValue::from_str(&format!("private, max-age={}", entry.remaining_ttl_secs()))
    {
        headers.insert(CACHE_CONTROL, cache_control);
    }
    headers.insert("X-Cache", HeaderValue::from_static(cache_status));
    response
}

/// Whether an `If-None-Match` header value matches `etag`
fn etag_matches(header: &str, etag: &str) -> bool {
    header.split(',').map(str::trim).any(|candidate| {
        candidate == "*" || candidate.strip_prefix("W/").unwrap_or(candidate) == etag
    })
}

/// Whether the query string asks to bypass the cache
fn wants_refresh(query: Option<&str>) -> bool {
    query
        .map(|q| {
            q.split('&').any(|pair| {
                matches!(
                    pair.split_once('='),
                    Some(("refresh", "true" | "1")) | Some(("force_refresh", "true" | "1"))
                )
            })
        })
        .unwrap_or(false)
}
