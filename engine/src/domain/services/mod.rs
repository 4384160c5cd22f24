pub mod health_monitor;
pub mod process_supervisor;
pub mod readiness_prober;
pub mod recovery_policy;
pub mod retry;
pub mod service_registry;

pub use health_monitor::{HealthMonitor, HealthMonitorSettings};
pub use process_supervisor::{ProcessHandle, ProcessSupervisor, TerminateOutcome};
pub use readiness_prober::ReadinessProber;
pub use recovery_policy::{RecoveryAction, RecoveryPolicy};
pub use retry::{retry_with_interval, Attempt, RetryError, RetryPolicy};
pub use service_registry::{PriorityGroup, ServiceRegistry};
