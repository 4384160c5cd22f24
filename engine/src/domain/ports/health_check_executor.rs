//! Port for health check execution
//! Defines the interface for probing a service once

use crate::domain::{DomainError, HealthStatus, ServiceDefinition};
use async_trait::async_trait;

/// Port for executing health checks
#[async_trait]
pub trait HealthCheckExecutor: Send + Sync {
    /// Probe the service once.
    ///
    /// `Ok(Unhealthy)` covers refused connections and non-2xx answers.
    /// `Err(DomainError::HealthCheckAborted)` asks the caller to stop retrying.
    async fn check(
        &self,
        definition: &ServiceDefinition,
        pid: Option<u32>,
    ) -> Result<HealthStatus, DomainError>;
}
