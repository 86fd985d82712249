use std::sync::Arc;

use axum::{routing::get, Router};
use dar_recorder::Recorder;

/// Shared state, passed as `Arc<AppState>` to all Axum handlers.
pub struct AppState {
    pub recorder: Arc<Recorder>,
}

impl AppState {
    pub fn new(recorder: Arc<Recorder>) -> Self {
        Self { recorder }
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    use crate::http::{dar, health, programs, todos};

    Router::new()
        .route("/health", get(health::health_handler))
        .route("/dar", get(dar::info))
        .route("/dar/state", get(dar::state))
        .route("/dar/start", get(dar::start))
        .route("/dar/pause", get(dar::pause))
        .route("/dar/resume", get(dar::resume))
        .route("/dar/shutdown", get(dar::shutdown))
        .route("/programs/reload", get(programs::reload))
        .route("/todos", get(todos::list))
        .route("/todos/{id}", get(todos::get))
        .route("/todos/{id}/suspend", get(todos::suspend))
        .route("/todos/{id}/requeue", get(todos::requeue))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
