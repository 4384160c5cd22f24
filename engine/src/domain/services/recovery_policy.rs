//! Recovery policy
//! Decides what a failure of a running service leads to: restart, wait or give up

use crate::domain::ServiceState;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Terminate the old process and start a new one
    Restart,
    /// Too soon after the last restart; stay unhealthy and look again at `retry_at`
    Cooldown { retry_at: Instant },
    /// Restart ceiling reached; the service is failed for the rest of the run
    GiveUp,
}

#[derive(Debug, Clone, Copy)]
pub struct RecoveryPolicy {
    ceiling: u32,
    cooldown: Duration,
}

impl RecoveryPolicy {
    pub fn new(ceiling: u32, cooldown: Duration) -> Self {
        Self { ceiling, cooldown }
    }

    pub fn ceiling(&self) -> u32 {
        self.ceiling
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub fn on_failure(&self, state: &ServiceState, now: Instant) -> RecoveryAction {
        if state.restart_count() >= self.ceiling {
            return RecoveryAction::GiveUp;
        }

        if let Some(last) = state.last_restart_at() {
            let retry_at = last + self.cooldown;
            if now < retry_at {
                return RecoveryAction::Cooldown { retry_at };
            }
        }

        RecoveryAction::Restart
    }
}
