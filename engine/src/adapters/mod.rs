//! Driving Adapters Layer
//!
//! Adapters that accept external requests and translate them into
//! orchestrator queries.
//!
//! ## Available Adapters
//!
//! - **REST**: read-only status API with JSON
//!
//! ## Usage
//!
//! ```rust,no_run
//! use svc_engine::adapters::rest::build_router;
//! use svc_engine::application::{Orchestrator, OrchestratorSettings};
//! use svc_engine::infrastructure::{StandardHealthCheckExecutor, TokioProcessExecutor};
//! use std::sync::Arc;
//!
//! # fn example() -> Result<(), svc_engine::domain::DomainError> {
//! let orchestrator = Orchestrator::new(
//!     vec![],
//!     Arc::new(TokioProcessExecutor::new()),
//!     Arc::new(StandardHealthCheckExecutor::default()),
//!     OrchestratorSettings::default(),
//! )?;
//! let router = build_router(orchestrator);
//! # let _ = router;
//! # Ok(())
//! # }
//! ```

pub mod rest;
