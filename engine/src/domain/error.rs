//! Domain-level errors
//! Configuration mistakes, startup failures and lifecycle violations

use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum DomainError {
    // Configuration errors (fatal, detected before anything is spawned)
    #[error("Service '{0}' is registered more than once")]
    DuplicateService(String),

    #[error("Service '{service}' depends on unknown service '{dependency}'")]
    DependencyNotFound { service: String, dependency: String },

    #[error("Dependency cycle detected between services: {}", .0.join(", "))]
    DependencyCycle(Vec<String>),

    #[error(
        "Service '{service}' (priority {priority}) depends on '{dependency}' \
         which starts later (priority {dependency_priority})"
    )]
    DependencyInLaterGroup {
        service: String,
        priority: i32,
        dependency: String,
        dependency_priority: i32,
    },

    #[error("Invalid service id: {0}")]
    InvalidName(String),

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    // Lookup
    #[error("Service '{0}' not found")]
    ServiceNotFound(String),

    // Spawn errors
    #[error("Failed to spawn service '{service}': {source}")]
    SpawnFailed {
        service: String,
        #[source]
        source: Arc<std::io::Error>,
    },

    #[error("Service '{service}' already has a live process (PID: {pid})")]
    AlreadyRunning { service: String, pid: u32 },

    // Readiness errors
    #[error("Service '{service}' did not become ready after {attempts} attempts")]
    ReadinessTimeout { service: String, attempts: u32 },

    #[error("Readiness check for '{service}' aborted: {reason}")]
    ReadinessAborted { service: String, reason: String },

    #[error("Service '{service}' exited with code {exit_code} during startup")]
    ExitedDuringStartup { service: String, exit_code: i32 },

    // Dependency propagation
    #[error("Service '{service}' requires '{dependency}' which is not running")]
    UnsatisfiedDependency { service: String, dependency: String },

    // Lifecycle errors
    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Orchestrator is {0}, operation not allowed")]
    InvalidPhase(String),

    #[error("Orchestrator is shutting down")]
    ShuttingDown,

    #[error("Operation cancelled")]
    Cancelled,

    // Termination errors
    #[error("Failed to send signal {signal} to PID {pid}: {reason}")]
    SignalFailed { pid: u32, signal: i32, reason: String },

    #[error("Process {pid} of service '{service}' could not be terminated")]
    TerminateFailed { service: String, pid: u32 },

    // Health check errors
    #[error("Health check aborted: {0}")]
    HealthCheckAborted(String),
}

impl DomainError {
    /// Errors that abort orchestration entirely instead of failing one service.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            DomainError::DuplicateService(_)
                | DomainError::DependencyNotFound { .. }
                | DomainError::DependencyCycle(_)
                | DomainError::DependencyInLaterGroup { .. }
                | DomainError::InvalidName(_)
                | DomainError::InvalidCommand(_)
                | DomainError::InvalidConfiguration(_)
        )
    }

    pub fn spawn_failed(service: impl Into<String>, source: std::io::Error) -> Self {
        DomainError::SpawnFailed {
            service: service.into(),
            source: Arc::new(source),
        }
    }
}

pub type Result<T> = std::result::Result<T, DomainError>;
