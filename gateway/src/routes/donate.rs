//! Donation endpoint

use bytes::Bytes;
use chrono::Utc;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::routes::{error_response, json_response};
use crate::server::AppState;
use crate::store::DonationReceipt;
use crate::types::GatewayError;

/// `POST /api/donate` body
#[derive(Debug, Deserialize)]
pub struct DonateRequest {
    pub donor_id: String,
    pub kwh: f64,
    #[serde(default)]
    pub context: Option<String>,
}

#[derive(Debug, Serialize)]
struct DonateResponse {
    message: &'static str,
    #[serde(flatten)]
    receipt: DonationReceipt,
}

/// Handle `POST /api/donate`
pub async fn handle_donate(state: &AppState, body: Bytes) -> Response<Full<Bytes>> {
    let request: DonateRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => return error_response(GatewayError::from(e)),
    };
    if request.donor_id.trim().is_empty() {
        return error_response(GatewayError::BadRequest("donor_id is required".to_string()));
    }

    let receipt = match state
        .store
        .record_donation(&request.donor_id, request.kwh, request.context, Utc::now())
        .await
    {
        Ok(r) => r,
        Err(e) => return error_response(e),
    };

    let invalidated = state.cache.invalidate_all();
    info!(
        donor_id = %request.donor_id,
        kwh = receipt.event.amount_kwh,
        capped = receipt.capped,
        invalidated,
        "Donation accepted"
    );

    json_response(
        StatusCode::OK,
        &DonateResponse {
            message: if receipt.capped {
                "Donation capped at remaining monthly capacity"
            } else {
                "Donation recorded"
            },
            receipt,
        },
    )
}
