//! ServiceStatus value object
//! Lifecycle status of one orchestrated service

use serde::{Deserialize, Serialize};
use std::fmt;

/// The status of a service during an orchestration run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    /// Registered but no start attempted yet
    #[default]
    NotStarted,

    /// Spawned, readiness probe in progress
    Starting,

    /// Ready and serving
    Running,

    /// Failed a health check or exited unexpectedly; awaiting recovery
    Unhealthy,

    /// Startup failed or restarts exhausted; no further attempts this run
    Failed,

    /// Terminated during orchestrator shutdown
    Stopped,
}

impl ServiceStatus {
    /// Terminal outcome of a startup attempt
    pub fn is_settled(&self) -> bool {
        matches!(self, ServiceStatus::Running | ServiceStatus::Failed)
    }

    /// A process is expected to exist for this service
    pub fn has_process(&self) -> bool {
        matches!(
            self,
            ServiceStatus::Starting | ServiceStatus::Running | ServiceStatus::Unhealthy
        )
    }

    /// Validate state transition.
    ///
    /// `NotStarted -> Starting -> {Running, Failed}`,
    /// `Running -> {Unhealthy, Failed, Stopped}`,
    /// `Unhealthy -> {Running, Failed}`.
    pub fn can_transition_to(&self, next: ServiceStatus) -> bool {
        use ServiceStatus::*;

        matches!(
            (self, next),
            (NotStarted, Starting)
                | (Starting, Running)
                | (Starting, Failed)
                | (Running, Unhealthy)
                | (Running, Failed)
                | (Running, Stopped)
                | (Unhealthy, Running)
                | (Unhealthy, Failed)
        )
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceStatus::NotStarted => write!(f, "not_started"),
            ServiceStatus::Starting => write!(f, "starting"),
            ServiceStatus::Running => write!(f, "running"),
            ServiceStatus::Unhealthy => write!(f, "unhealthy"),
            ServiceStatus::Failed => write!(f, "failed"),
            ServiceStatus::Stopped => write!(f, "stopped"),
        }
    }
}
