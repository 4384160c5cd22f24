//! REST routes

use super::handlers::{get_health, get_service_status, get_status, AppState};
use axum::{routing::get, Router};

pub fn build_router(orchestrator: AppState) -> Router {
    Router::new()
        .route("/status", get(get_status))
        .route("/status/:id", get(get_service_status))
        .route("/health", get(get_health))
        .with_state(orchestrator)
}
