//! REST API handlers using axum

use crate::application::{Orchestrator, ServiceStatusEntry, StatusReport};
use crate::domain::DomainError;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Shared application state
pub type AppState = Orchestrator;

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Liveness of the orchestrator itself
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub phase: String,
}

fn error_status(err: &DomainError) -> StatusCode {
    match err {
        DomainError::ServiceNotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// GET /status - Full status report
pub async fn get_status(State(orchestrator): State<AppState>) -> Json<StatusReport> {
    let report = orchestrator.status();
    debug!(services = report.services.len(), phase = %report.phase, "Status served");
    Json(report)
}

/// GET /status/:id - One service
pub async fn get_service_status(
    State(orchestrator): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ServiceStatusEntry>, (StatusCode, Json<ErrorResponse>)> {
    orchestrator.service_status(&id).map(Json).map_err(|e| {
        debug!(service = %id, error = %e, "Service status lookup failed");
        (
            error_status(&e),
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
    })
}

/// GET /health - Orchestrator liveness
pub async fn get_health(State(orchestrator): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        phase: orchestrator.phase().to_string(),
    })
}
