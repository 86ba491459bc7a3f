//! HTTP routes for the gateway

pub mod donate;
pub mod health;
pub mod leaderboard;
pub mod predict;
pub mod users;

pub use donate::handle_donate;
pub use health::health_check;
pub use leaderboard::handle_leaderboard;
pub use predict::handle_predict;
pub use users::{handle_electricity, handle_position, handle_previous};

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderValue, ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE};
use hyper::{Response, StatusCode};
use serde::Serialize;
use tracing::{error, warn};

use crate::types::GatewayError;

/// API error body
#[derive(Debug, Serialize)]
struct ApiError {
    error: String,
    code: &'static str,
}

/// Build a JSON response with CORS headers
pub fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Response<Full<Bytes>> {
    match serde_json::to_vec(value) {
        Ok(body) => json_bytes_response(status, body),
        Err(e) => {
            error!("Failed to serialize response: {}", e);
            json_bytes_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                br#"{"error":"Serialization failed","code":"INTERNAL_ERROR"}"#.to_vec(),
            )
        }
    }
}

/// Build a JSON response from already-serialized bytes
pub fn json_bytes_response(status: StatusCode, body: Vec<u8>) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    response
}

/// Build a JSON error response, logging server-side failures
pub fn error_response(err: GatewayError) -> Response<Full<Bytes>> {
    let code = err.code();
    let (status, message) = err.into_status_code_and_body();
    if status.is_server_error() {
        error!(status = status.as_u16(), "{}", message);
    } else if status == StatusCode::UNPROCESSABLE_ENTITY {
        warn!(status = status.as_u16(), "{}", message);
    }
    json_response(
        status,
        &ApiError {
            error: message,
            code,
        },
    )
}
