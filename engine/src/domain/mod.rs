pub mod entities;
pub mod error;
pub mod events;
pub mod ports;
pub mod services;
pub mod value_objects;

pub use entities::{
    HealthCheckOutcome, ServiceDefinition, ServiceDefinitionBuilder, ServiceState, StatusChange,
};
pub use error::{DomainError, Result};
pub use events::{FailureEvent, FailureKind, HealthCheckEvent, SupervisionEvent};
pub use value_objects::{
    HealthCheck, HealthPredicate, HealthStatus, ProbeContext, ProbeError, ServiceId,
    ServiceStatus, StartCommand,
};
