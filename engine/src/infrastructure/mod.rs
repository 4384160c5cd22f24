//! Infrastructure Layer
//!
//! Driven adapters implementing the domain ports against the real system.
//!
//! ## Adapters
//!
//! - `TokioProcessExecutor`: OS processes via tokio, output streamed into tracing
//! - `StandardHealthCheckExecutor`: HTTP checks and custom predicates
//! - `TcpProbe` / `ExecProbe`: built-in custom predicates
//! - `config`: YAML service tables
//!
//! ## Usage
//!
//! ```rust,no_run
//! use svc_engine::application::Orchestrator;
//! use svc_engine::infrastructure::{load_config_from_path, StandardHealthCheckExecutor, TokioProcessExecutor};
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config_from_path("/etc/svc-orchestrator/services.yaml")?;
//! let orchestrator = Orchestrator::new(
//!     config.definitions()?,
//!     Arc::new(TokioProcessExecutor::new()),
//!     Arc::new(StandardHealthCheckExecutor::new(config.orchestrator.health_check_timeout())),
//!     config.orchestrator,
//! )?;
//! # let _ = orchestrator;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod health_check_executor;
pub mod probes;
pub mod tokio_executor;

pub use config::{
    load_config_dir, load_config_from_path, Config, HealthCheckConfig, ReadinessConfig,
    ServiceConfig,
};
pub use health_check_executor::StandardHealthCheckExecutor;
pub use probes::{ExecProbe, TcpProbe};
pub use tokio_executor::{TokioProcessExecutor, SERVICE_OUTPUT_TARGET};
