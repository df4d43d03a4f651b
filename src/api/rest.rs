// =============================================================================
// REST API Endpoints: Axum 0.7
// =============================================================================
//
// Public:  `/` and `/api/v1/health` (liveness, no auth).
// Data:    everything else under `/api/v1/`, behind the `AuthBearer`
//          extractor when a token is configured.
//
// Engine failures map to 404 for an unknown instrument and 422 for data that
// could not be analysed, always with a JSON body carrying the reason code.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::auth::AuthBearer;
use crate::app_state::AppState;
use crate::error::EngineError;
use crate::report::{distribution_message, help_text, instrument_message};

// =============================================================================
// Router construction
// =============================================================================

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // ── Public ──────────────────────────────────────────────────
        .route("/", get(root))
        .route("/api/v1/health", get(health))
        // ── Data ────────────────────────────────────────────────────
        .route("/api/v1/help", get(help))
        .route("/api/v1/instruments", get(instruments))
        .route("/api/v1/flow/:key", get(flow))
        .route("/api/v1/flow/:key/text", get(flow_text))
        .route("/api/v1/distribution", get(distribution))
        // ── Middleware & State ───────────────────────────────────────
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Error mapping
// =============================================================================

pub struct ApiError(EngineError);

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            EngineError::UnknownInstrument { .. } => StatusCode::NOT_FOUND,
            EngineError::InsufficientData { .. } | EngineError::MalformedShape { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
        };
        let body = serde_json::json!({
            "error": self.0.to_string(),
            "code": self.0.code(),
            "instrument": self.0.instrument(),
        });
        (status, Json(body)).into_response()
    }
}

// =============================================================================
// Liveness (public)
// =============================================================================

async fn root() -> &'static str {
    "Smart Money Flow is running"
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.health())
}

// =============================================================================
// Catalogue
// =============================================================================

async fn help(_auth: AuthBearer, State(state): State<Arc<AppState>>) -> String {
    help_text(state.engine.config())
}

#[derive(Serialize)]
struct InstrumentEntry<'a> {
    key: &'a str,
    symbol: &'a str,
}

async fn instruments(_auth: AuthBearer, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let entries: Vec<InstrumentEntry<'_>> = state
        .engine
        .config()
        .instruments
        .iter()
        .map(|(key, symbol)| InstrumentEntry { key, symbol })
        .collect();
    Json(serde_json::json!({ "instruments": entries }))
}

// =============================================================================
// Point query
// =============================================================================

async fn flow(
    _auth: AuthBearer,
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state.engine.instrument_report(&key).await?;
    Ok(Json(report))
}

async fn flow_text(
    _auth: AuthBearer,
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<String, ApiError> {
    let report = state.engine.instrument_report(&key).await?;
    Ok(instrument_message(&report, state.engine.config().rsx.period))
}

// =============================================================================
// Batch query
// =============================================================================

#[derive(Debug, Deserialize)]
struct DistributionQuery {
    /// Comma separated instrument keys; all configured instruments if absent.
    instruments: Option<String>,
    /// `text` for the chat caption instead of JSON.
    format: Option<String>,
}

fn parse_keys(raw: Option<&str>) -> Option<Vec<String>> {
    let keys: Vec<String> = raw?
        .split(',')
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();
    (!keys.is_empty()).then_some(keys)
}

async fn distribution(
    _auth: AuthBearer,
    State(state): State<Arc<AppState>>,
    Query(query): Query<DistributionQuery>,
) -> Response {
    let keys = parse_keys(query.instruments.as_deref());
    let batch = state.engine.universe_report(keys.as_deref()).await;
    info!(
        instruments = batch.reports.len(),
        failures = batch.failures.len(),
        "distribution served"
    );

    if query.format.as_deref() == Some("text") {
        distribution_message(&batch, state.engine.config().lookback_days).into_response()
    } else {
        Json(batch).into_response()
    }
}

// =============================================================================
// Tests
// =============================================================================
