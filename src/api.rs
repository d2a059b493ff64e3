use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::HeaderValue,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tower_http::cors::CorsLayer;

use crate::analyze::behavior::{analyze_behavior, BehaviorReport, BrowsingEvent};
use crate::error::{AnalyzeError, Result};
use crate::pipeline::AnalysisPipeline;

/// Response header carrying HIT / MISS / JOINED.
pub const CACHE_HEADER: &str = "x-analysis-cache";

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<AnalysisPipeline>,
}

impl AppState {
    pub fn new(pipeline: AnalysisPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/analyze", get(analyze))
        .route("/analyze_behavior", post(behavior))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Deserialize)]
struct AnalyzeQuery {
    #[serde(default)]
    target: Option<String>,
}

async fn analyze(State(state): State<AppState>, Query(q): Query<AnalyzeQuery>) -> Result<Response> {
    // missing and blank targets both end up as 400 in the pipeline
    let target = q.target.unwrap_or_default();
    let (result, status) = state.pipeline.analyze(&target).await?;

    let mut resp = Json(result.as_ref()).into_response();
    resp.headers_mut()
        .insert(CACHE_HEADER, HeaderValue::from_static(status.as_str()));
    Ok(resp)
}

async fn behavior(
    State(state): State<AppState>,
    payload: std::result::Result<Json<Vec<BrowsingEvent>>, JsonRejection>,
) -> Result<Json<BehaviorReport>> {
    // keep the {"detail": ...} shape for unreadable bodies too
    let Json(events) = payload.map_err(|e| AnalyzeError::BadRequest(e.body_text()))?;
    let report = analyze_behavior(&events, state.pipeline.oracle()).await?;
    Ok(Json(report))
}
