//! Health check executor implementation
//! Performs HTTP checks and runs custom predicates

use crate::domain::ports::HealthCheckExecutor;
use crate::domain::{
    DomainError, HealthCheck, HealthPredicate, HealthStatus, ProbeContext, ProbeError,
    ServiceDefinition,
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Standard health check executor
pub struct StandardHealthCheckExecutor {
    host: String,
    timeout: Duration,
}

impl StandardHealthCheckExecutor {
    pub fn new(timeout: Duration) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            timeout,
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }
}

impl Default for StandardHealthCheckExecutor {
    fn default() -> Self {
        Self::new(Duration::from_secs(
            crate::constants::health_check::DEFAULT_TIMEOUT,
        ))
    }
}

#[async_trait]
impl HealthCheckExecutor for StandardHealthCheckExecutor {
    async fn check(
        &self,
        definition: &ServiceDefinition,
        pid: Option<u32>,
    ) -> Result<HealthStatus, DomainError> {
        match definition.health_check() {
            HealthCheck::None => Ok(HealthStatus::Healthy),
            HealthCheck::Http { path } => {
                let port = definition.port().ok_or_else(|| {
                    DomainError::InvalidConfiguration(format!(
                        "HTTP health check of '{}' needs a port",
                        definition.id()
                    ))
                })?;
                let url = format!("http://{}:{}{}", self.host, port, path);
                Ok(perform_http_check(url, self.timeout).await)
            }
            HealthCheck::Custom(predicate) => {
                let ctx = ProbeContext {
                    service: definition.id().to_string(),
                    port: definition.port(),
                    pid,
                };
                run_predicate(predicate.as_ref(), &ctx, self.timeout).await
            }
        }
    }
}

/// Any 2xx answer is healthy; refused connections and other codes are not
async fn perform_http_check(url: String, timeout: Duration) -> HealthStatus {
    debug!(url = %url, "Performing HTTP health check");

    let result = tokio::task::spawn_blocking(move || {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        match agent.get(&url).call() {
            Ok(resp) if (200..300).contains(&resp.status()) => HealthStatus::Healthy,
            Ok(resp) => {
                debug!(url = %url, status = resp.status(), "HTTP health check got non-2xx answer");
                HealthStatus::Unhealthy
            }
            Err(ureq::Error::Status(code, _)) => {
                debug!(url = %url, status = code, "HTTP health check failed");
                HealthStatus::Unhealthy
            }
            Err(e) => {
                debug!(url = %url, error = %e, "HTTP health check error");
                HealthStatus::Unhealthy
            }
        }
    })
    .await;

    match result {
        Ok(status) => status,
        Err(e) => {
            error!(error = %e, "HTTP health check task failed");
            HealthStatus::Unhealthy
        }
    }
}

async fn run_predicate(
    predicate: &dyn HealthPredicate,
    ctx: &ProbeContext,
    timeout: Duration,
) -> Result<HealthStatus, DomainError> {
    match tokio::time::timeout(timeout, predicate.probe(ctx)).await {
        Ok(Ok(true)) => Ok(HealthStatus::Healthy),
        Ok(Ok(false)) => Ok(HealthStatus::Unhealthy),
        Ok(Err(ProbeError::Transient(reason))) => {
            debug!(service = %ctx.service, predicate = predicate.name(), reason = %reason, "Probe not satisfied");
            Ok(HealthStatus::Unhealthy)
        }
        Ok(Err(ProbeError::Fatal(reason))) => {
            warn!(service = %ctx.service, predicate = predicate.name(), reason = %reason, "Probe aborted");
            Err(DomainError::HealthCheckAborted(reason))
        }
        Err(_) => {
            debug!(service = %ctx.service, predicate = predicate.name(), "Probe timed out");
            Ok(HealthStatus::Unhealthy)
        }
    }
}
