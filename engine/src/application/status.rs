//! Aggregate status
//! Read-only snapshots of the orchestrator and its services

use crate::domain::ServiceStatus;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle phase of the orchestrator itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorPhase {
    Idle,
    /// Starting the group with this priority
    StartingGroup(i32),
    Monitoring,
    Stopping,
    Stopped,
}

impl fmt::Display for OrchestratorPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::StartingGroup(priority) => write!(f, "starting_group({})", priority),
            Self::Monitoring => write!(f, "monitoring"),
            Self::Stopping => write!(f, "stopping"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastHealthCheck {
    pub healthy: bool,
    pub seconds_ago: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStatusEntry {
    pub id: String,
    pub display_name: String,
    pub status: ServiceStatus,
    pub priority: i32,
    pub port: Option<u16>,
    pub secondary_port: Option<u16>,
    pub pid: Option<u32>,
    pub uptime_secs: Option<u64>,
    pub restart_count: u32,
    pub health_check: String,
    pub last_health_check: Option<LastHealthCheck>,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheckTotals {
    pub performed: u64,
    pub passed: u64,
    pub failed: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTotals {
    pub running: usize,
    pub failed: usize,
    pub unhealthy: usize,
    pub stopped: usize,
    pub starting: usize,
    pub not_started: usize,
    pub health_checks: HealthCheckTotals,
}

impl StatusTotals {
    pub fn count(&mut self, status: ServiceStatus) {
        match status {
            ServiceStatus::NotStarted => self.not_started += 1,
            ServiceStatus::Starting => self.starting += 1,
            ServiceStatus::Running => self.running += 1,
            ServiceStatus::Unhealthy => self.unhealthy += 1,
            ServiceStatus::Failed => self.failed += 1,
            ServiceStatus::Stopped => self.stopped += 1,
        }
    }
}

/// Full status report, as served on `GET /status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub phase: String,
    pub services: Vec<ServiceStatusEntry>,
    pub totals: StatusTotals,
}

impl StatusReport {
    pub fn service(&self, id: &str) -> Option<&ServiceStatusEntry> {
        self.services.iter().find(|s| s.id == id)
    }

    pub fn status_of(&self, id: &str) -> Option<ServiceStatus> {
        self.service(id).map(|s| s.status)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedService {
    pub id: String,
    pub error: Option<String>,
}

/// Outcome of `Orchestrator::start`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartupReport {
    pub running: Vec<String>,
    pub failed: Vec<FailedService>,
    /// Left untouched because shutdown began first
    pub not_started: Vec<String>,
}

impl StartupReport {
    pub fn all_running(&self) -> bool {
        self.failed.is_empty() && self.not_started.is_empty()
    }

    pub fn is_failed(&self, id: &str) -> bool {
        self.failed.iter().any(|f| f.id == id)
    }
}
