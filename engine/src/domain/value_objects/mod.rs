pub mod health_check;
pub mod service_id;
pub mod service_status;
pub mod start_command;

pub use health_check::{HealthCheck, HealthPredicate, HealthStatus, ProbeContext, ProbeError};
pub use service_id::ServiceId;
pub use service_status::ServiceStatus;
pub use start_command::StartCommand;
