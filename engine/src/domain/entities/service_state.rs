//! ServiceState entity
//! Mutable runtime record of one service, owned by the orchestrator

use crate::domain::{DomainError, ServiceStatus};
use tokio::time::Instant;

/// One recorded status transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub status: ServiceStatus,
    /// Orchestrator-wide sequence number, strictly increasing across services
    pub seq: u64,
    pub at: Instant,
}

/// Result of the most recent health probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthCheckOutcome {
    pub healthy: bool,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ServiceState {
    status: ServiceStatus,
    pid: Option<u32>,
    generation: Option<u64>,
    started_at: Option<Instant>,
    last_health_check_at: Option<Instant>,
    last_health_check: Option<HealthCheckOutcome>,
    restart_count: u32,
    last_restart_at: Option<Instant>,
    last_error: Option<String>,
    history: Vec<StatusChange>,
}

impl ServiceState {
    pub fn new() -> Self {
        Self::default()
    }

    // ===== Getters =====

    pub fn status(&self) -> ServiceStatus {
        self.status
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Generation of the process currently attached to this service
    pub fn generation(&self) -> Option<u64> {
        self.generation
    }

    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    pub fn last_health_check_at(&self) -> Option<Instant> {
        self.last_health_check_at
    }

    pub fn last_health_check(&self) -> Option<&HealthCheckOutcome> {
        self.last_health_check.as_ref()
    }

    pub fn restart_count(&self) -> u32 {
        self.restart_count
    }

    pub fn last_restart_at(&self) -> Option<Instant> {
        self.last_restart_at
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn history(&self) -> &[StatusChange] {
        &self.history
    }

    /// First time the service entered `status`
    pub fn first_entered(&self, status: ServiceStatus) -> Option<&StatusChange> {
        self.history.iter().find(|c| c.status == status)
    }

    // ===== Lifecycle =====

    /// Move to `next`, rejecting transitions outside the lifecycle graph
    pub fn transition_to(
        &mut self,
        next: ServiceStatus,
        seq: u64,
        at: Instant,
    ) -> Result<(), DomainError> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::InvalidStateTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        self.history.push(StatusChange {
            status: next,
            seq,
            at,
        });
        Ok(())
    }

    /// Mark a service that was never started as failed, e.g. because a
    /// dependency is not running. Only valid from `NotStarted`.
    pub fn fail_before_start(
        &mut self,
        error: impl Into<String>,
        seq: u64,
        at: Instant,
    ) -> Result<(), DomainError> {
        if self.status != ServiceStatus::NotStarted {
            return Err(DomainError::InvalidStateTransition {
                from: self.status.to_string(),
                to: ServiceStatus::Failed.to_string(),
            });
        }
        self.status = ServiceStatus::Failed;
        self.last_error = Some(error.into());
        self.history.push(StatusChange {
            status: ServiceStatus::Failed,
            seq,
            at,
        });
        Ok(())
    }

    /// Record the process backing this service
    pub fn attach_process(&mut self, pid: u32, generation: u64, at: Instant) {
        self.pid = Some(pid);
        self.generation = Some(generation);
        self.started_at = Some(at);
    }

    pub fn detach_process(&mut self) {
        self.pid = None;
        self.started_at = None;
    }

    /// Whether an event tagged with `generation` still refers to the live process
    pub fn is_current_generation(&self, generation: u64) -> bool {
        self.generation == Some(generation)
    }

    pub fn record_health_check(&mut self, healthy: bool, detail: Option<String>, at: Instant) {
        self.last_health_check_at = Some(at);
        self.last_health_check = Some(HealthCheckOutcome { healthy, detail });
    }

    /// Count a restart attempt. Never reset during a run.
    pub fn record_restart(&mut self, at: Instant) {
        self.restart_count += 1;
        self.last_restart_at = Some(at);
    }

    pub fn set_error(&mut self, error: impl Into<String>) {
        self.last_error = Some(error.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ServiceStatus::*;

    #[test]
    fn test_lifecycle_history() {
        let t0 = Instant::now();
        let mut state = ServiceState::new();
        assert_eq!(state.status(), NotStarted);

        state.transition_to(Starting, 1, t0).unwrap();
        state.attach_process(42, 1, t0);
        state.transition_to(Running, 2, t0).unwrap();

        assert_eq!(state.status(), Running);
        assert_eq!(state.pid(), Some(42));
        assert_eq!(state.history().len(), 2);
        assert_eq!(state.first_entered(Running).map(|c| c.seq), Some(2));
        assert!(state.first_entered(Failed).is_none());
    }

    #[test]
    fn test_invalid_transition_is_rejected() {
        let mut state = ServiceState::new();
        let err = state
            .transition_to(Running, 1, Instant::now())
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidStateTransition { .. }));
        assert_eq!(state.status(), NotStarted);
        assert!(state.history().is_empty());
    }

    #[test]
    fn test_fail_before_start() {
        let mut state = ServiceState::new();
        state
            .fail_before_start("dependency db is not running", 1, Instant::now())
            .unwrap();
        assert_eq!(state.status(), Failed);
        assert!(state.first_entered(Starting).is_none());
        assert_eq!(state.last_error(), Some("dependency db is not running"));

        // Only from not_started
        assert!(state.fail_before_start("again", 2, Instant::now()).is_err());
    }

    #[test]
    fn test_generation_tracking() {
        let mut state = ServiceState::new();
        state.attach_process(10, 3, Instant::now());
        assert!(state.is_current_generation(3));
        assert!(!state.is_current_generation(2));
        state.detach_process();
        assert_eq!(state.pid(), None);
        // Generation survives detach so late events of that process are still recognised
        assert!(state.is_current_generation(3));
    }

    #[test]
    fn test_restart_bookkeeping() {
        let mut state = ServiceState::new();
        let now = Instant::now();
        state.record_restart(now);
        state.record_restart(now);
        assert_eq!(state.restart_count(), 2);
        assert_eq!(state.last_restart_at(), Some(now));

        state.record_health_check(false, Some("HTTP 500".into()), now);
        assert_eq!(
            state.last_health_check(),
            Some(&HealthCheckOutcome {
                healthy: false,
                detail: Some("HTTP 500".into())
            })
        );
        state.set_error("boom");
        assert_eq!(state.last_error(), Some("boom"));
    }
}
