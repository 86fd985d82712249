//! `/dar/*` — recorder state and lifecycle shortcuts.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use dar_recorder::RecorderInfo;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::http::error::ApiResult;

/// GET /dar
pub async fn info(State(state): State<Arc<AppState>>) -> ApiResult<Json<RecorderInfo>> {
    Ok(Json(state.recorder.get_info().await?))
}

/// GET /dar/state
pub async fn state(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({ "state": state.recorder.get_state() }))
}

/// GET /dar/start
pub async fn start(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    Ok(Json(json!({ "result": state.recorder.start().await? })))
}

/// GET /dar/pause
pub async fn pause(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    Ok(Json(json!({ "result": state.recorder.pause().await? })))
}

/// GET /dar/resume
pub async fn resume(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    Ok(Json(json!({ "result": state.recorder.resume().await? })))
}

#[derive(Debug, Deserialize)]
pub struct ShutdownParams {
    /// Wait for running captures to finish.
    #[serde(default)]
    pub wait: bool,
}

/// GET /dar/shutdown[?wait=true]
pub async fn shutdown(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ShutdownParams>,
) -> ApiResult<Json<Value>> {
    Ok(Json(json!({ "result": state.recorder.stop(params.wait).await? })))
}
