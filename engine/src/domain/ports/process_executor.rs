//! ProcessExecutor port
//! Interface for spawning and signalling OS processes

use crate::domain::{DomainError, ServiceDefinition};
use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;

/// Environment variable carrying the service port
pub const PORT_ENV_VAR: &str = "PORT";
/// Environment variable carrying the optional secondary port
pub const SECONDARY_PORT_ENV_VAR: &str = "SECONDARY_PORT";

/// Configuration for spawning a process
#[derive(Debug, Clone)]
pub struct SpawnConfig {
    /// Service id, used to label captured output
    pub service: String,
    pub command: String,
    pub args: Vec<String>,
    pub working_dir: Option<String>,
    pub env_vars: Vec<(String, String)>,
}

/// Handle for monitoring process exit
/// Resolves once with the exit code, without polling
pub type ProcessExitHandle = Pin<Box<dyn Future<Output = Result<i32, DomainError>> + Send>>;

/// Result of spawning a process
pub struct SpawnResult {
    pub pid: u32,
    /// Optional handle to wait for process exit
    /// None means the exit cannot be observed (externally-managed resource)
    pub exit_handle: Option<ProcessExitHandle>,
}

impl std::fmt::Debug for SpawnResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpawnResult")
            .field("pid", &self.pid)
            .field("exit_handle", &self.exit_handle.is_some())
            .finish()
    }
}

/// Port for executing system processes
#[async_trait]
pub trait ProcessExecutor: Send + Sync {
    /// Spawn a new process. Fails synchronously when the OS refuses.
    async fn spawn(&self, config: SpawnConfig) -> Result<SpawnResult, DomainError>;

    /// Send `signal` to `pid`
    async fn kill(&self, pid: u32, signal: i32) -> Result<(), DomainError>;

    /// Check if a process is still running
    async fn is_running(&self, pid: u32) -> Result<bool, DomainError>;
}

impl SpawnConfig {
    pub fn from_definition(definition: &ServiceDefinition) -> Self {
        let mut env_vars: Vec<(String, String)> = definition
            .env()
            .iter()
            .filter(|(k, _)| {
                k.as_str() != PORT_ENV_VAR && k.as_str() != SECONDARY_PORT_ENV_VAR
            })
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        // The declared port always wins over a hand-written PORT entry
        if let Some(port) = definition.port() {
            env_vars.push((PORT_ENV_VAR.to_string(), port.to_string()));
        }
        if let Some(port) = definition.secondary_port() {
            env_vars.push((SECONDARY_PORT_ENV_VAR.to_string(), port.to_string()));
        }

        Self {
            service: definition.id().to_string(),
            command: definition.command().program().to_string(),
            args: definition.command().args().to_vec(),
            working_dir: definition.working_dir().map(|s| s.to_string()),
            env_vars,
        }
    }

    pub fn env(&self, key: &str) -> Option<&str> {
        self.env_vars
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}
