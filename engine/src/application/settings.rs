//! Orchestrator tunables

use crate::constants::{health_check, readiness, recovery, shutdown};
use crate::domain::services::{HealthMonitorSettings, RetryPolicy};
use crate::domain::DomainError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Orchestrator-wide settings. Every field has a default, so a partial
/// `orchestrator:` block in a config file is enough.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OrchestratorSettings {
    pub readiness_max_attempts: u32,
    pub readiness_interval_ms: u64,
    pub health_check_interval_sec: u64,
    pub health_check_timeout_sec: u64,
    pub health_failure_threshold: u32,
    pub health_retry_interval_ms: u64,
    pub restart_ceiling: u32,
    pub restart_cooldown_sec: u64,
    pub stop_grace_period_sec: u64,
    pub kill_wait_sec: u64,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            readiness_max_attempts: readiness::DEFAULT_MAX_ATTEMPTS,
            readiness_interval_ms: readiness::DEFAULT_INTERVAL_MS,
            health_check_interval_sec: health_check::DEFAULT_INTERVAL,
            health_check_timeout_sec: health_check::DEFAULT_TIMEOUT,
            health_failure_threshold: health_check::DEFAULT_FAILURE_THRESHOLD,
            health_retry_interval_ms: health_check::DEFAULT_RETRY_INTERVAL_MS,
            restart_ceiling: recovery::DEFAULT_RESTART_CEILING,
            restart_cooldown_sec: recovery::DEFAULT_COOLDOWN,
            stop_grace_period_sec: shutdown::DEFAULT_GRACE_PERIOD,
            kill_wait_sec: shutdown::DEFAULT_KILL_WAIT,
        }
    }
}

impl OrchestratorSettings {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.readiness_max_attempts == 0 {
            return Err(DomainError::InvalidConfiguration(
                "readiness_max_attempts must be at least 1".to_string(),
            ));
        }
        if self.health_check_interval_sec == 0 {
            return Err(DomainError::InvalidConfiguration(
                "health_check_interval_sec must be at least 1".to_string(),
            ));
        }
        if self.health_failure_threshold == 0 {
            return Err(DomainError::InvalidConfiguration(
                "health_failure_threshold must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn readiness_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.readiness_max_attempts,
            Duration::from_millis(self.readiness_interval_ms),
        )
    }

    pub fn health_monitor(&self) -> HealthMonitorSettings {
        HealthMonitorSettings {
            interval: Duration::from_secs(self.health_check_interval_sec),
            failure_threshold: self.health_failure_threshold,
            retry_interval: Duration::from_millis(self.health_retry_interval_ms),
        }
    }

    pub fn health_check_timeout(&self) -> Duration {
        Duration::from_secs(self.health_check_timeout_sec)
    }

    pub fn restart_cooldown(&self) -> Duration {
        Duration::from_secs(self.restart_cooldown_sec)
    }

    pub fn stop_grace_period(&self) -> Duration {
        Duration::from_secs(self.stop_grace_period_sec)
    }

    pub fn kill_wait(&self) -> Duration {
        Duration::from_secs(self.kill_wait_sec)
    }
}
