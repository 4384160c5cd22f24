//! Health check value objects
//! Describes how readiness and health of a service are observed

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// What a custom predicate gets to look at when probing
#[derive(Debug, Clone)]
pub struct ProbeContext {
    pub service: String,
    pub port: Option<u16>,
    pub pid: Option<u32>,
}

/// Failure raised by a custom predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    /// Counts as "not ready yet" / "unhealthy"
    Transient(String),
    /// Stops readiness probing immediately
    Fatal(String),
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeError::Transient(msg) => write!(f, "{}", msg),
            ProbeError::Fatal(msg) => write!(f, "fatal: {}", msg),
        }
    }
}

/// Custom readiness/health predicate
#[async_trait]
pub trait HealthPredicate: Send + Sync {
    /// Short label used in logs and the status report
    fn name(&self) -> &str;

    /// `Ok(true)` means healthy, `Ok(false)` means not (yet) healthy
    async fn probe(&self, ctx: &ProbeContext) -> Result<bool, ProbeError>;
}

/// Health check descriptor of a service definition
#[derive(Clone, Default)]
pub enum HealthCheck {
    /// No externally observable readiness signal
    #[default]
    None,
    /// `GET http://localhost:<port><path>`, any 2xx is healthy
    Http { path: String },
    /// Arbitrary async predicate
    Custom(Arc<dyn HealthPredicate>),
}

impl HealthCheck {
    pub fn http(path: impl Into<String>) -> Self {
        let path = path.into();
        let path = if path.starts_with('/') {
            path
        } else {
            format!("/{}", path)
        };
        HealthCheck::Http { path }
    }

    pub fn custom<P: HealthPredicate + 'static>(predicate: P) -> Self {
        HealthCheck::Custom(Arc::new(predicate))
    }

    pub fn is_none(&self) -> bool {
        matches!(self, HealthCheck::None)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            HealthCheck::None => "none",
            HealthCheck::Http { .. } => "http",
            HealthCheck::Custom(_) => "custom",
        }
    }
}

impl fmt::Debug for HealthCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthCheck::None => write!(f, "None"),
            HealthCheck::Http { path } => f.debug_struct("Http").field("path", path).finish(),
            HealthCheck::Custom(p) => f.debug_tuple("Custom").field(&p.name()).finish(),
        }
    }
}

/// Outcome of a single probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    #[default]
    Unknown, // Not yet checked or no health check configured
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Unhealthy => write!(f, "unhealthy"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}
