pub mod service_definition;
pub mod service_state;

pub use service_definition::{ServiceDefinition, ServiceDefinitionBuilder};
pub use service_state::{HealthCheckOutcome, ServiceState, StatusChange};
