//! Failsight HTTP API
//!
//! Axum server exposing the loaded dashboard context to presentation clients.
//! Each endpoint has a thin axum handler that delegates to a pure inner
//! function; the inner functions are directly testable without axum dispatch.
//!
//! Endpoints:
//! - GET  /ping: liveness
//! - GET  /health: counts and source fingerprints
//! - GET  /version: server version info
//! - GET  /report: failure prediction report
//! - GET  /deep-dives: per-sensor series for every configured work order
//! - GET  /narratives: every narrative found in the document
//! - GET  /narratives/:id: narrative for one work order
//! - GET  /series/:id: per-sensor series for one work order
//! - POST /preview: first rows of an uploaded delimited file

use std::sync::Arc;

use anyhow::Result;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use failsight_core::config::PreviewConfig;
use failsight_core::encoding::resolve_label;
use failsight_core::protocol::{DashboardRequest, DashboardResponse, PROTOCOL};
use failsight_core::{preview_delimited, DashboardContext, FailsightConfig, FailsightError};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

/// Largest number of rows a preview request may ask for.
pub const MAX_PREVIEW_ROWS: usize = 100;

/// Shared state for all HTTP handlers
pub struct HttpState {
    pub context: Arc<DashboardContext>,
    pub config: FailsightConfig,
}

/// Build the Axum router with all endpoints
pub fn build_router(state: Arc<HttpState>) -> Router {
    Router::new()
        .route("/ping", get(ping_handler))
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        .route("/report", get(report_handler))
        .route("/deep-dives", get(deep_dives_handler))
        .route("/narratives", get(narratives_handler))
        .route("/narratives/:id", get(narrative_handler))
        .route("/series/:id", get(series_handler))
        .route("/preview", post(preview_handler))
        .with_state(state)
}

/// Start the HTTP server on the configured address.
/// Gracefully shuts down when the broadcast shutdown signal fires.
pub async fn start_http_server(
    context: Arc<DashboardContext>,
    config: FailsightConfig,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let addr = format!("{}:{}", config.http.host, config.http.port);
    let state = Arc::new(HttpState { context, config });

    let app = build_router(state);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Failsight HTTP API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTP server shutting down...");
        })
        .await?;

    Ok(())
}

// ============================================================================
// Request DTOs
// ============================================================================

#[derive(Debug, Deserialize, Default)]
pub struct PreviewParams {
    pub rows: Option<usize>,
}

// ============================================================================
// Inner (directly testable) functions
// ============================================================================

pub fn ping_inner(context: &DashboardContext) -> (StatusCode, serde_json::Value) {
    dispatch(context, DashboardRequest::Ping, |data| data)
}

pub fn health_inner(context: &DashboardContext) -> (StatusCode, serde_json::Value) {
    dispatch(context, DashboardRequest::Health, |mut data| {
        if let Some(obj) = data.as_object_mut() {
            obj.insert("version".to_string(), serde_json::json!(env!("CARGO_PKG_VERSION")));
        }
        data
    })
}

/// Inner version: returns version info (pure, no IO).
pub fn version_inner() -> serde_json::Value {
    serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "protocol": PROTOCOL,
    })
}

pub fn report_inner(context: &DashboardContext) -> (StatusCode, serde_json::Value) {
    dispatch(context, DashboardRequest::Report, |data| data)
}

pub fn deep_dives_inner(context: &DashboardContext) -> (StatusCode, serde_json::Value) {
    dispatch(context, DashboardRequest::DeepDive, |data| data)
}

pub fn narratives_inner(context: &DashboardContext) -> (StatusCode, serde_json::Value) {
    dispatch(context, DashboardRequest::Narratives, |data| data)
}

pub fn narrative_inner(context: &DashboardContext, work_order: String) -> (StatusCode, serde_json::Value) {
    dispatch(context, DashboardRequest::Narrative { work_order }, |data| data)
}

pub fn series_inner(context: &DashboardContext, work_order: String) -> (StatusCode, serde_json::Value) {
    dispatch(context, DashboardRequest::Series { work_order }, |data| data)
}

/// Inner preview: decodes the upload and returns its first rows.
///
/// Undecodable or unparseable uploads are `422`; a bad row count is `400`.
pub fn preview_inner(
    config: &PreviewConfig,
    params: PreviewParams,
    body: &[u8],
) -> (StatusCode, serde_json::Value) {
    let rows = params.rows.unwrap_or(config.rows);
    if rows == 0 || rows > MAX_PREVIEW_ROWS {
        return (
            StatusCode::BAD_REQUEST,
            error_body(format!("rows must be between 1 and {}", MAX_PREVIEW_ROWS)),
        );
    }

    let fallback = match resolve_label(&config.fallback_encoding) {
        Ok(enc) => enc,
        Err(e) => return (StatusCode::INTERNAL_SERVER_ERROR, error_body(e.to_string())),
    };

    match preview_delimited(body, rows, fallback) {
        Ok(preview) => match serde_json::to_value(&preview) {
            Ok(v) => (StatusCode::OK, v),
            Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, error_body(e.to_string())),
        },
        Err(e @ (FailsightError::Decode { .. } | FailsightError::SourceFormat { .. })) => {
            tracing::warn!("Upload preview rejected: {}", e);
            (StatusCode::UNPROCESSABLE_ENTITY, error_body(e.to_string()))
        }
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, error_body(e.to_string())),
    }
}

// ============================================================================
// Axum handler wrappers (thin, delegate to inner functions)
// ============================================================================

pub async fn ping_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = ping_inner(&state.context);
    (status, Json(body))
}

pub async fn health_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = health_inner(&state.context);
    (status, Json(body))
}

pub async fn version_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(version_inner()))
}

pub async fn report_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = report_inner(&state.context);
    (status, Json(body))
}

pub async fn deep_dives_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = deep_dives_inner(&state.context);
    (status, Json(body))
}

pub async fn narratives_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = narratives_inner(&state.context);
    (status, Json(body))
}

pub async fn narrative_handler(
    State(state): State<Arc<HttpState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let (status, body) = narrative_inner(&state.context, id);
    (status, Json(body))
}

pub async fn series_handler(
    State(state): State<Arc<HttpState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let (status, body) = series_inner(&state.context, id);
    (status, Json(body))
}

pub async fn preview_handler(
    State(state): State<Arc<HttpState>>,
    Query(params): Query<PreviewParams>,
    body: Bytes,
) -> impl IntoResponse {
    let (status, body) = preview_inner(&state.config.preview, params, &body);
    (status, Json(body))
}

// ============================================================================
// Helpers
// ============================================================================

fn dispatch(
    context: &DashboardContext,
    request: DashboardRequest,
    decorate: impl FnOnce(serde_json::Value) -> serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let response = crate::router::handle_request(request, context);
    match response_to_http(response) {
        Ok(data) => (StatusCode::OK, decorate(data)),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, error_body(e)),
    }
}

fn error_body(msg: impl Into<String>) -> serde_json::Value {
    serde_json::json!({
        "error": msg.into(),
        "status": "error",
    })
}

/// Convert a `DashboardResponse` into an HTTP body value, or an error string.
pub fn response_to_http(response: DashboardResponse) -> std::result::Result<serde_json::Value, String> {
    if response.is_ok() {
        Ok(response.data.unwrap_or(serde_json::json!({})))
    } else {
        Err(response.error.unwrap_or_else(|| "unknown error".to_string()))
    }
}

// ============================================================================
// Unit Tests: call inner functions directly
// ============================================================================
