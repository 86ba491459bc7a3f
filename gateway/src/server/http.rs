//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo for async handling.

use bytes::Bytes;
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::{Body, Incoming};
use hyper::header::{HeaderValue, IF_NONE_MATCH};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::borrow::Cow;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use forecast::Forecaster;

use crate::cache::{self, PredictionCache};
use crate::config::Args;
use crate::routes;
use crate::store::DonationStore;
use crate::types::GatewayError;

type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Largest accepted request body
const MAX_BODY_BYTES: usize = 16 * 1024;

/// Shared application state
pub struct AppState {
    pub args: Args,
    /// Donors and donation events
    pub store: Arc<DonationStore>,
    /// Rank-prediction engine
    pub forecaster: Forecaster,
    /// Cached prediction responses
    pub cache: Arc<PredictionCache>,
    /// Process start, for uptime reporting
    pub started_at: Instant,
}

impl AppState {
    pub fn new(args: Args, store: DonationStore, forecaster: Forecaster) -> Self {
        let cache = Arc::new(PredictionCache::new(args.cache_config()));
        Self {
            args,
            store: Arc::new(store),
            forecaster,
            cache,
            started_at: Instant::now(),
        }
    }
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<(), GatewayError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!("Gateway listening on {}", state.args.listen);

    cache::spawn_cleanup_task(Arc::clone(&state.cache));
    info!(
        "Prediction cache enabled (ttl {}s, max {} entries)",
        state.cache.config().ttl.as_secs(),
        state.cache.config().max_entries
    );

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .preserve_header_case(true)
                        .title_case_headers(true)
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Log and route one request from the network
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<BoxBody>, hyper::Error> {
    info!("[{}] {} {}", addr, req.method(), req.uri().path());
    Ok(to_boxed(dispatch(state, req).await))
}

/// Route a request to its handler
pub async fn dispatch<B>(state: Arc<AppState>, req: Request<B>) -> Response<Full<Bytes>>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(str::to_string);

    match (method, path.as_str()) {
        // Health check endpoints
        (Method::GET, "/health") | (Method::GET, "/healthz") => {
            routes::health_check(&state).await
        }

        // CORS preflight
        (Method::OPTIONS, _) => preflight_response(),

        (Method::GET, p) if p.starts_with("/predict/") => {
            match path_param(p, "/predict/", "") {
                Some(donor_id) => {
                    let if_none_match = req
                        .headers()
                        .get(IF_NONE_MATCH)
                        .and_then(|v| v.to_str().ok());
                    routes::handle_predict(&state, &donor_id, query.as_deref(), if_none_match)
                        .await
                }
                None => bad_request_response("Missing donor id in path"),
            }
        }

        (Method::GET, "/api/leaderboard") => routes::handle_leaderboard(&state).await,

        (Method::GET, p) if p.starts_with("/api/users/") => {
            if let Some(donor_id) = path_param(p, "/api/users/", "/position") {
                routes::handle_position(&state, &donor_id).await
            } else if let Some(donor_id) = path_param(p, "/api/users/", "/previous") {
                routes::handle_previous(&state, &donor_id).await
            } else if let Some(donor_id) = path_param(p, "/api/users/", "/electricity") {
                routes::handle_electricity(&state, &donor_id).await
            } else {
                not_found_response(p)
            }
        }

        (Method::POST, "/api/donate") => {
            match Limited::new(req.into_body(), MAX_BODY_BYTES).collect().await {
                Ok(collected) => routes::handle_donate(&state, collected.to_bytes()).await,
                Err(e) => {
                    warn!("Donate request body error: {}", e);
                    bad_request_response("Failed to read request body")
                }
            }
        }

        // Not found
        _ => not_found_response(&path),
    }
}

/// Percent-decoded single segment between `prefix` and `suffix`
fn path_param<'a>(path: &'a str, prefix: &str, suffix: &str) -> Option<Cow<'a, str>> {
    let segment = path.strip_prefix(prefix)?.strip_suffix(suffix)?;
    if segment.is_empty() || segment.contains('/') {
        return None;
    }
    let decoded = urlencoding::decode(segment).ok()?;
    (!decoded.is_empty()).then_some(decoded)
}

/// Convert a Full<Bytes> body to BoxBody
fn to_boxed(response: Response<Full<Bytes>>) -> Response<BoxBody> {
    response.map(|body| body.map_err(|never| match never {}).boxed())
}

/// CORS preflight response
fn preflight_response() -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::new()));
    let headers = response.headers_mut();
    headers.insert("Access-Control-Allow-Origin", HeaderValue::from_static("*"));
    headers.insert("Access-Control-Allow-Headers", HeaderValue::from_static("*"));
    headers.insert(
        "Access-Control-Allow-Methods",
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    response
}

/// Not found response
fn not_found_response(path: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "error": "Not Found",
        "path": path,
        "hint": "Try /predict/{donor_id}, /api/leaderboard or /health"
    });
    routes::json_response(StatusCode::NOT_FOUND, &body)
}

/// Bad request response
fn bad_request_response(message: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "error": "Bad Request",
        "message": message
    });
    routes::json_response(StatusCode::BAD_REQUEST, &body)
}
