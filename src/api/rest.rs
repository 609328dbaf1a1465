// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// Thin JSON surface over `MarketDataService`. Every data endpoint answers 200
// with a body or 404 when no data could be obtained; the reason for a 404 is
// only visible in logs and on `/api/v1/gateway`.
//
// CORS is configured permissively for development.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::app_state::AppState;
use crate::types::Interval;

const DEFAULT_SYMBOL: &str = "MSFT";
const DEFAULT_RANGE: &str = "1D";

// =============================================================================
// Router construction
// =============================================================================

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/gateway", get(gateway))
        .route("/api/v1/resolve", get(resolve))
        .route("/api/v1/intraday", get(intraday))
        .route("/api/v1/daily", get(daily))
        .route("/api/v1/quote", get(quote))
        .route("/api/v1/range", get(range))
        .route("/api/v1/popular", get(popular))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn found<T: Serialize>(value: Option<T>) -> Response {
    match value {
        Some(v) => Json(v).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

fn default_symbol() -> String {
    DEFAULT_SYMBOL.to_string()
}

// =============================================================================
// Health / operator
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    configured: bool,
    server_time: i64,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        configured: state.service.client().is_configured(),
        server_time: chrono::Utc::now().timestamp_millis(),
    })
}

async fn gateway(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.gateway_report())
}

// =============================================================================
// Symbol search
// =============================================================================

#[derive(Deserialize)]
struct ResolveParams {
    #[serde(default)]
    q: String,
}

#[derive(Serialize)]
struct ResolveResponse {
    symbol: String,
}

async fn resolve(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ResolveParams>,
) -> Response {
    let cancel = state.request_token();
    let symbol = state.service.resolve_symbol(&params.q, &cancel).await;
    found(symbol.map(|symbol| ResolveResponse { symbol }))
}

// =============================================================================
// Series
// =============================================================================

#[derive(Deserialize)]
struct IntradayParams {
    #[serde(default = "default_symbol")]
    symbol: String,
    #[serde(default)]
    interval: Option<String>,
}

async fn intraday(
    State(state): State<Arc<AppState>>,
    Query(params): Query<IntradayParams>,
) -> Response {
    let interval = match params.interval.as_deref() {
        None | Some("") => state.default_interval,
        Some(raw) => match raw.parse::<Interval>() {
            Ok(iv) => iv,
            Err(e) => {
                let body = serde_json::json!({ "error": e.to_string() });
                return (StatusCode::BAD_REQUEST, Json(body)).into_response();
            }
        },
    };

    let cancel = state.request_token();
    let series = state
        .service
        .fetch_series(&params.symbol, interval, &cancel)
        .await;
    if let Some(s) = &series {
        info!(symbol = s.symbol(), interval = %interval, points = s.len(), "intraday served");
    }
    found(series)
}

#[derive(Deserialize)]
struct SymbolParams {
    #[serde(default = "default_symbol")]
    symbol: String,
}

async fn daily(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SymbolParams>,
) -> Response {
    let cancel = state.request_token();
    found(state.service.fetch_daily(&params.symbol, &cancel).await)
}

#[derive(Deserialize)]
struct RangeParams {
    #[serde(default = "default_symbol")]
    symbol: String,
    #[serde(default)]
    range: Option<String>,
}

async fn range(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RangeParams>,
) -> Response {
    let code = params.range.as_deref().unwrap_or(DEFAULT_RANGE);
    let cancel = state.request_token();
    found(state.service.resolve_range(&params.symbol, code, &cancel).await)
}

// =============================================================================
// Quotes
// =============================================================================

async fn quote(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SymbolParams>,
) -> Response {
    let cancel = state.request_token();
    found(state.service.fetch_quote(&params.symbol, &cancel).await)
}

async fn popular(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let cancel = state.request_token();
    Json(state.service.popular_quotes(&cancel).await)
}

// =============================================================================
// Tests
// =============================================================================
