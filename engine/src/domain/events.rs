//! Supervision events
//! One-way notifications from supervisors and monitors to the orchestrator

use crate::domain::ServiceId;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Why a service is being reported as failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// Health probe failed after the configured threshold
    HealthCheckFailed,
    /// Process exited without being asked to
    ProcessExited { exit_code: i32 },
    /// A restart suppressed by the cooldown is due for re-evaluation
    CooldownElapsed,
    /// A restart attempt did not bring the service back
    RestartFailed,
}

#[derive(Debug, Clone)]
pub struct FailureEvent {
    pub service_id: ServiceId,
    /// Process generation the failure refers to
    pub generation: u64,
    pub kind: FailureKind,
    pub detail: String,
}

#[derive(Debug, Clone)]
pub struct HealthCheckEvent {
    pub service_id: ServiceId,
    pub generation: u64,
    pub healthy: bool,
    pub detail: Option<String>,
    pub at: Instant,
}

#[derive(Debug, Clone)]
pub enum SupervisionEvent {
    HealthChecked(HealthCheckEvent),
    Failure(FailureEvent),
}

impl SupervisionEvent {
    pub fn service_id(&self) -> &ServiceId {
        match self {
            SupervisionEvent::HealthChecked(e) => &e.service_id,
            SupervisionEvent::Failure(e) => &e.service_id,
        }
    }
}

pub type EventSender = mpsc::UnboundedSender<SupervisionEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<SupervisionEvent>;

pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
