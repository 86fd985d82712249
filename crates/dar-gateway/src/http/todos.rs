//! `/todos/*` — scheduled jobs as to-do items (queued or suspended).

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use dar_scheduler::{JobRecord, JobStatus};
use serde::Serialize;

use crate::app::AppState;
use crate::http::error::{ApiError, ApiResult};

#[derive(Debug, Serialize)]
pub struct TodoItem {
    pub id: String,
    pub status: JobStatus,
    pub info: String,
    pub next_run_time: Option<String>,
}

impl From<&JobRecord> for TodoItem {
    fn from(job: &JobRecord) -> Self {
        Self {
            id: job.id.clone(),
            status: job.status(),
            info: job.to_string(),
            next_run_time: job.next_run_time.map(|t| t.to_rfc3339()),
        }
    }
}

/// GET /todos
pub async fn list(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<TodoItem>>> {
    let jobs = state.recorder.list_jobs().await?;
    Ok(Json(jobs.iter().map(TodoItem::from).collect()))
}

/// GET /todos/{id}
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<JobRecord>> {
    state
        .recorder
        .get_job(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(&id))
}

/// GET /todos/{id}/suspend
pub async fn suspend(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<TodoItem>> {
    let job = state.recorder.pause_job(&id).await?;
    Ok(Json(TodoItem::from(&job)))
}

/// GET /todos/{id}/requeue — `null` when the job had nothing left to fire and
/// was removed.
pub async fn requeue(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Option<TodoItem>>> {
    let job = state.recorder.resume_job(&id).await?;
    Ok(Json(job.as_ref().map(TodoItem::from)))
}
