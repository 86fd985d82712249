use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use dar_recorder::{ReloadOptions, ReloadResult};
use serde::Deserialize;

use crate::app::AppState;
use crate::http::error::ApiResult;

#[derive(Debug, Deserialize)]
pub struct ReloadParams {
    pub create: Option<bool>,
    pub update: Option<bool>,
    pub pause: Option<bool>,
}

impl From<ReloadParams> for ReloadOptions {
    fn from(p: ReloadParams) -> Self {
        let all = ReloadOptions::default();
        ReloadOptions {
            create: p.create.unwrap_or(all.create),
            update: p.update.unwrap_or(all.update),
            pause: p.pause.unwrap_or(all.pause),
        }
    }
}

/// GET /programs/reload[?create=&update=&pause=] — reload programs from the
/// config file.
pub async fn reload(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ReloadParams>,
) -> ApiResult<Json<ReloadResult>> {
    Ok(Json(state.recorder.reload(params.into()).await?))
}
