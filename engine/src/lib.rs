//! Service orchestration and health supervision engine
//!
//! Starts a static table of services in priority order, waits for each to
//! become ready, keeps them healthy with periodic checks and bounded
//! restarts, and shuts everything down on request.
//!
//! ## Layers
//!
//! - `domain`: entities, ports and supervision services
//! - `application`: the `Orchestrator` and its status reports
//! - `infrastructure`: OS processes, probes, YAML configuration
//! - `adapters`: read-only REST status API

pub mod adapters;
pub mod application;
pub mod constants;
pub mod domain;
pub mod infrastructure;
