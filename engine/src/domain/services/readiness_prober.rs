//! Readiness prober
//! Decides when a freshly spawned service may be considered available

use super::process_supervisor::ProcessHandle;
use super::retry::{retry_with_interval, Attempt, RetryError, RetryPolicy};
use crate::domain::ports::HealthCheckExecutor;
use crate::domain::{DomainError, HealthCheck, HealthStatus, ServiceDefinition};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub struct ReadinessProber {
    health: Arc<dyn HealthCheckExecutor>,
}

impl ReadinessProber {
    pub fn new(health: Arc<dyn HealthCheckExecutor>) -> Self {
        Self { health }
    }

    /// Poll the service's health check until it passes.
    ///
    /// Returns the number of probes it took (0 without a health check).
    /// Fails with `ReadinessTimeout` when attempts run out, `ReadinessAborted`
    /// when the check asks to stop, `ExitedDuringStartup` when the process
    /// dies first and `Cancelled` when `cancel` fires.
    pub async fn wait_until_ready(
        &self,
        definition: &ServiceDefinition,
        handle: &ProcessHandle,
        policy: RetryPolicy,
        cancel: &CancellationToken,
    ) -> Result<u32, DomainError> {
        let service = definition.id();
        if matches!(definition.health_check(), HealthCheck::None) {
            debug!(service = %service, "No health check, ready once spawned");
            return Ok(0);
        }

        let probe = retry_with_interval(policy, cancel, |attempt| async move {
            match self.health.check(definition, Some(handle.pid())).await {
                Ok(HealthStatus::Healthy) => Attempt::Ready(attempt),
                Ok(status) => {
                    debug!(service = %service, attempt = attempt, status = %status, "Not ready yet");
                    Attempt::NotYet(format!("health check reported {}", status))
                }
                Err(DomainError::HealthCheckAborted(reason)) => Attempt::Abort(reason),
                Err(e) => {
                    debug!(service = %service, attempt = attempt, error = %e, "Probe error");
                    Attempt::NotYet(e.to_string())
                }
            }
        });

        let result = tokio::select! {
            result = probe => result,
            exit_code = handle.wait_exit() => {
                warn!(service = %service, exit_code = exit_code, "Process exited during startup");
                return Err(DomainError::ExitedDuringStartup {
                    service: service.to_string(),
                    exit_code,
                });
            }
        };

        match result {
            Ok(attempts) => {
                info!(service = %service, attempts = attempts, "Service is ready");
                Ok(attempts)
            }
            Err(RetryError::Exhausted { attempts, last }) => {
                warn!(
                    service = %service,
                    attempts = attempts,
                    last_error = last.as_deref().unwrap_or("none"),
                    "Readiness probe timed out"
                );
                Err(DomainError::ReadinessTimeout {
                    service: service.to_string(),
                    attempts,
                })
            }
            Err(RetryError::Aborted(reason)) => Err(DomainError::ReadinessAborted {
                service: service.to_string(),
                reason,
            }),
            Err(RetryError::Cancelled) => Err(DomainError::Cancelled),
        }
    }
}
