//! Application layer
//! Orchestrator and the read models it exposes

pub mod orchestrator;
pub mod settings;
pub mod status;

pub use orchestrator::Orchestrator;
pub use settings::OrchestratorSettings;
pub use status::{
    FailedService, HealthCheckTotals, LastHealthCheck, OrchestratorPhase, ServiceStatusEntry,
    StartupReport, StatusReport, StatusTotals,
};
