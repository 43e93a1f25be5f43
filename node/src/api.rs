//! # Rosetta HTTP API
//!
//! Builds the axum router exposing the Rosetta Data API and the
//! construction preprocess step. Every Rosetta endpoint is a JSON `POST`;
//! failures are rendered as HTTP 500 carrying the Rosetta `Error` object.
//!
//! ## Endpoints
//!
//! | Method | Path                       | Description                          |
//! |--------|----------------------------|--------------------------------------|
//! | GET    | `/health`                  | Liveness probe                       |
//! | POST   | `/network/list`            | Networks served by this node         |
//! | POST   | `/network/status`          | Tip and genesis block identifiers    |
//! | POST   | `/network/options`         | Version and allowed values           |
//! | POST   | `/block`                   | Block by index or hash               |
//! | POST   | `/block/transaction`       | One transaction of a block           |
//! | POST   | `/construction/preprocess` | Parse operations into an intent      |

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::State,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use hmy_rosetta::chain::ChainReader;
use hmy_rosetta::services::{BlockService, ConstructionService, NetworkService};
use hmy_rosetta::types::{
    BlockRequest, BlockTransactionRequest, ConstructionPreprocessRequest, NetworkRequest,
};
use hmy_rosetta::{ErrorKind, RosettaConfig, RosettaError};

use crate::metrics::{NodeMetrics, SharedMetrics};

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Services shared by all request handlers. Cheap to clone.
pub struct AppState<C> {
    pub network: Arc<NetworkService<C>>,
    pub blocks: Arc<BlockService<C>>,
    pub construction: Arc<ConstructionService>,
    pub metrics: SharedMetrics,
}

impl<C> Clone for AppState<C> {
    fn clone(&self) -> Self {
        Self {
            network: Arc::clone(&self.network),
            blocks: Arc::clone(&self.blocks),
            construction: Arc::clone(&self.construction),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

impl<C: ChainReader> AppState<C> {
    pub fn new(config: &RosettaConfig, chain: Arc<C>, metrics: SharedMetrics) -> Self {
        Self {
            network: Arc::new(NetworkService::new(config, Arc::clone(&chain))),
            blocks: Arc::new(BlockService::new(config, chain)),
            construction: Arc::new(ConstructionService::new(config)),
            metrics,
        }
    }
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the API router with CORS, request tracing and panic recovery.
pub fn create_router<C: ChainReader + 'static>(state: AppState<C>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/network/list", post(network_list_handler::<C>))
        .route("/network/status", post(network_status_handler::<C>))
        .route("/network/options", post(network_options_handler::<C>))
        .route("/block", post(block_handler::<C>))
        .route("/block/transaction", post(block_transaction_handler::<C>))
        .route("/construction/preprocess", post(preprocess_handler::<C>))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::new())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Error rendering
// ---------------------------------------------------------------------------

/// A failed Rosetta call. Always HTTP 500 with the wire error as body.
pub struct ApiError(pub RosettaError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.0.kind() {
            ErrorKind::NotFound | ErrorKind::InvalidInput => {
                tracing::debug!(kind = self.0.kind().label(), error = %self.0, "request rejected")
            }
            _ => tracing::warn!(kind = self.0.kind().label(), error = %self.0, "request failed"),
        }
        (StatusCode::INTERNAL_SERVER_ERROR, Json(self.0.to_wire())).into_response()
    }
}

/// Records the call in metrics and renders its outcome.
fn respond<T: Serialize>(
    metrics: &NodeMetrics,
    endpoint: &'static str,
    started: Instant,
    result: Result<T, RosettaError>,
) -> Response {
    metrics.requests_total.with_label_values(&[endpoint]).inc();
    metrics
        .request_latency_seconds
        .with_label_values(&[endpoint])
        .observe(started.elapsed().as_secs_f64());
    match result {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(err) => {
            metrics.record_error(err.kind());
            ApiError(err).into_response()
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health`. Does not touch chain data.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `POST /network/list`. The request body carries nothing we use.
async fn network_list_handler<C: ChainReader>(State(state): State<AppState<C>>) -> Response {
    let started = Instant::now();
    let list = state.network.network_list();
    respond(&state.metrics, "/network/list", started, Ok(list))
}

async fn network_status_handler<C: ChainReader>(
    State(state): State<AppState<C>>,
    Json(req): Json<NetworkRequest>,
) -> Response {
    let started = Instant::now();
    let result = state.network.network_status(&req.network_identifier).await;
    respond(&state.metrics, "/network/status", started, result)
}

async fn network_options_handler<C: ChainReader>(
    State(state): State<AppState<C>>,
    Json(req): Json<NetworkRequest>,
) -> Response {
    let started = Instant::now();
    let result = state.network.network_options(&req.network_identifier);
    respond(&state.metrics, "/network/options", started, result)
}

async fn block_handler<C: ChainReader>(
    State(state): State<AppState<C>>,
    Json(req): Json<BlockRequest>,
) -> Response {
    let started = Instant::now();
    let result = state
        .blocks
        .block(&req.network_identifier, &req.block_identifier)
        .await;
    respond(&state.metrics, "/block", started, result)
}

async fn block_transaction_handler<C: ChainReader>(
    State(state): State<AppState<C>>,
    Json(req): Json<BlockTransactionRequest>,
) -> Response {
    let started = Instant::now();
    let result = state
        .blocks
        .block_transaction(
            &req.network_identifier,
            &req.block_identifier,
            &req.transaction_identifier,
        )
        .await;
    respond(&state.metrics, "/block/transaction", started, result)
}

async fn preprocess_handler<C: ChainReader>(
    State(state): State<AppState<C>>,
    Json(req): Json<ConstructionPreprocessRequest>,
) -> Response {
    let started = Instant::now();
    let result = state
        .construction
        .preprocess(&req.network_identifier, &req.operations);
    respond(&state.metrics, "/construction/preprocess", started, result)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
