//! REST API endpoint handlers.
//!
//! Every handler is a thin adapter over [`ToolRouter`]. Requests that carry
//! an `x-session-id` header have their progress published to that session.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use routewise::analysis::{QueryAnalysis, StrategyReport};
use routewise::pipeline::PipelineOutput;
use routewise::router::ToolRouter;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

/// Header carrying the caller's progress session.
pub const SESSION_HEADER: &str = "x-session-id";

/// Shared application state passed to all handlers via axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<ToolRouter>,
}

/// JSON error body: `{"error": "...", "stage"?: "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: serde_json::Value,
}

impl ApiError {
    fn bad_request(message: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: json!({ "error": message }),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Request body shared by the query endpoints.
#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default)]
    pub personalization: Option<String>,
}

impl QueryRequest {
    fn query(&self) -> Result<&str, ApiError> {
        let query = self.query.trim();
        if query.is_empty() {
            return Err(ApiError::bad_request("query must not be empty"));
        }
        Ok(query)
    }
}

fn session_id(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// POST /api/analyze: Classify a query without running tools.
pub async fn post_analyze(
    State(app): State<AppState>,
    Json(body): Json<QueryRequest>,
) -> Result<Json<QueryAnalysis>, ApiError> {
    Ok(Json(app.router.analyze(body.query()?)))
}

/// POST /api/research: Analyze, choose a strategy, and run the tools.
///
/// Publishes thinking, 25% and 100% progress, then complete.
pub async fn post_research(
    State(app): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<QueryRequest>,
) -> Result<Json<StrategyReport>, ApiError> {
    let query = body.query()?;
    let session = session_id(&headers);
    let bus = app.router.progress();

    if let Some(sid) = session {
        bus.emit_thinking(sid, Some("Analyzing query..."));
        bus.emit_progress(sid, 25, "Running tools...");
    }
    let report = app.router.execute_optimal_strategy(query).await;
    if let Some(sid) = session {
        bus.emit_progress(sid, 100, "Tools finished");
        bus.emit_complete(sid, None);
    }
    info!(
        "Research finished: {} result(s) in {}ms",
        report.results.len(),
        report.execution_time_ms
    );
    Ok(Json(report))
}

/// POST /api/pipeline: Research, write, and review.
///
/// Returns `{research, draft, final}`, or 500 with the failing stage.
pub async fn post_pipeline(
    State(app): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<QueryRequest>,
) -> Result<Json<PipelineOutput>, ApiError> {
    let query = body.query()?;
    app.router
        .run_pipeline(query, session_id(&headers), body.personalization.as_deref())
        .await
        .map(Json)
        .map_err(|e| {
            warn!("Pipeline request failed: {e}");
            ApiError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: json!({ "error": e.to_string(), "stage": e.stage() }),
            }
        })
}

/// GET /api/tools: Registered tools and cache statistics.
pub async fn get_tools(State(app): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "tools": app.router.list_tools(),
        "cache": app.router.cache_stats(),
    }))
}

/// POST /api/tools/clear-cache: Drop every cached tool result.
pub async fn post_clear_cache(State(app): State<AppState>) -> StatusCode {
    app.router.clear_cache();
    StatusCode::NO_CONTENT
}
