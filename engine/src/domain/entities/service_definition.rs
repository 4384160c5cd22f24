//! ServiceDefinition entity
//! Static description of one service: how to start it and how to tell it is alive

use crate::domain::{DomainError, HealthCheck, ServiceId, StartCommand};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

/// Immutable service definition, created at configuration time
#[derive(Debug, Clone)]
pub struct ServiceDefinition {
    id: ServiceId,
    display_name: String,
    command: StartCommand,
    env: BTreeMap<String, String>,
    working_dir: Option<String>,
    port: Option<u16>,
    secondary_port: Option<u16>,
    health_check: HealthCheck,
    priority: i32,
    dependencies: BTreeSet<ServiceId>,

    // Per-service overrides of orchestrator settings
    readiness_max_attempts: Option<u32>,
    readiness_interval: Option<Duration>,
    stop_grace_period: Option<Duration>,
}

impl ServiceDefinition {
    /// Create a builder for a service definition
    ///
    /// # Example
    /// ```
    /// use svc_engine::domain::{HealthCheck, ServiceDefinition};
    ///
    /// let api = ServiceDefinition::builder("api", "/usr/bin/api-server")
    ///     .args(["--verbose"])
    ///     .port(8080)
    ///     .health_check(HealthCheck::http("/health"))
    ///     .priority(2)
    ///     .depends_on("db")
    ///     .build()?;
    /// assert_eq!(api.port(), Some(8080));
    /// # Ok::<(), svc_engine::domain::DomainError>(())
    /// ```
    pub fn builder(id: impl Into<String>, program: impl Into<String>) -> ServiceDefinitionBuilder {
        ServiceDefinitionBuilder::new(id, program)
    }

    pub fn id(&self) -> &ServiceId {
        &self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn command(&self) -> &StartCommand {
        &self.command
    }

    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    pub fn working_dir(&self) -> Option<&str> {
        self.working_dir.as_deref()
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn secondary_port(&self) -> Option<u16> {
        self.secondary_port
    }

    pub fn health_check(&self) -> &HealthCheck {
        &self.health_check
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn dependencies(&self) -> &BTreeSet<ServiceId> {
        &self.dependencies
    }

    pub fn readiness_max_attempts(&self) -> Option<u32> {
        self.readiness_max_attempts
    }

    pub fn readiness_interval(&self) -> Option<Duration> {
        self.readiness_interval
    }

    pub fn stop_grace_period(&self) -> Option<Duration> {
        self.stop_grace_period
    }
}

/// Builder for [`ServiceDefinition`]
#[derive(Debug)]
pub struct ServiceDefinitionBuilder {
    id: String,
    program: String,
    args: Vec<String>,
    display_name: Option<String>,
    env: BTreeMap<String, String>,
    working_dir: Option<String>,
    port: Option<u16>,
    secondary_port: Option<u16>,
    health_check: HealthCheck,
    priority: i32,
    dependencies: Vec<String>,
    readiness_max_attempts: Option<u32>,
    readiness_interval: Option<Duration>,
    stop_grace_period: Option<Duration>,
}

impl ServiceDefinitionBuilder {
    pub fn new(id: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            program: program.into(),
            args: Vec::new(),
            display_name: None,
            env: BTreeMap::new(),
            working_dir: None,
            port: None,
            secondary_port: None,
            health_check: HealthCheck::None,
            priority: 0,
            dependencies: Vec::new(),
            readiness_max_attempts: None,
            readiness_interval: None,
            stop_grace_period: None,
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn working_dir(mut self, dir: impl Into<String>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn secondary_port(mut self, port: u16) -> Self {
        self.secondary_port = Some(port);
        self
    }

    pub fn health_check(mut self, check: HealthCheck) -> Self {
        self.health_check = check;
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn depends_on(mut self, id: impl Into<String>) -> Self {
        self.dependencies.push(id.into());
        self
    }

    pub fn dependencies<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn readiness(mut self, max_attempts: u32, interval: Duration) -> Self {
        self.readiness_max_attempts = Some(max_attempts);
        self.readiness_interval = Some(interval);
        self
    }

    pub fn stop_grace_period(mut self, grace: Duration) -> Self {
        self.stop_grace_period = Some(grace);
        self
    }

    pub fn build(self) -> Result<ServiceDefinition, DomainError> {
        let id = ServiceId::parse(self.id)?;
        let command = StartCommand::new(self.program)?.with_args(self.args);

        let dependencies = self
            .dependencies
            .into_iter()
            .map(ServiceId::parse)
            .collect::<Result<BTreeSet<_>, _>>()?;
        if dependencies.contains(&id) {
            return Err(DomainError::DependencyCycle(vec![id.to_string()]));
        }

        if self.readiness_max_attempts == Some(0) {
            return Err(DomainError::InvalidConfiguration(format!(
                "Service '{}': readiness max_attempts must be at least 1",
                id
            )));
        }
        if self.port == Some(0) || self.secondary_port == Some(0) {
            return Err(DomainError::InvalidConfiguration(format!(
                "Service '{}': port 0 is not a valid service port",
                id
            )));
        }
        if matches!(self.health_check, HealthCheck::Http { .. }) && self.port.is_none() {
            return Err(DomainError::InvalidConfiguration(format!(
                "Service '{}' declares an HTTP health check but no port",
                id
            )));
        }

        Ok(ServiceDefinition {
            display_name: self.display_name.unwrap_or_else(|| id.to_string()),
            id,
            command,
            env: self.env,
            working_dir: self.working_dir,
            port: self.port,
            secondary_port: self.secondary_port,
            health_check: self.health_check,
            priority: self.priority,
            dependencies,
            readiness_max_attempts: self.readiness_max_attempts,
            readiness_interval: self.readiness_interval,
            stop_grace_period: self.stop_grace_period,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let def = ServiceDefinition::builder("db", "/usr/bin/postgres")
            .build()
            .unwrap();
        assert_eq!(def.id().as_str(), "db");
        assert_eq!(def.display_name(), "db");
        assert_eq!(def.priority(), 0);
        assert!(def.dependencies().is_empty());
        assert!(def.health_check().is_none());
        assert_eq!(def.port(), None);
        assert_eq!(def.readiness_max_attempts(), None);
    }

    #[test]
    fn test_builder_all_fields() {
        let def = ServiceDefinition::builder("api", "/usr/bin/api")
            .args(["--port", "8080"])
            .display_name("Public API")
            .env("RUST_LOG", "debug")
            .working_dir("/srv/api")
            .port(8080)
            .secondary_port(8081)
            .health_check(HealthCheck::http("/health"))
            .priority(2)
            .depends_on("db")
            .dependencies(["cache", "db"])
            .readiness(5, Duration::from_millis(200))
            .stop_grace_period(Duration::from_secs(3))
            .build()
            .unwrap();

        assert_eq!(def.display_name(), "Public API");
        assert_eq!(def.command().args().len(), 2);
        assert_eq!(def.env().get("RUST_LOG").map(String::as_str), Some("debug"));
        assert_eq!(def.working_dir(), Some("/srv/api"));
        assert_eq!(def.secondary_port(), Some(8081));
        // Duplicate dependency ids collapse into a set
        assert_eq!(def.dependencies().len(), 2);
        assert_eq!(def.readiness_interval(), Some(Duration::from_millis(200)));
        assert_eq!(def.stop_grace_period(), Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let err = ServiceDefinition::builder("loop", "/bin/true")
            .depends_on("loop")
            .build()
            .unwrap_err();
        assert!(matches!(err, DomainError::DependencyCycle(_)));
    }

    #[test]
    fn test_http_check_requires_port() {
        let err = ServiceDefinition::builder("web", "/bin/web")
            .health_check(HealthCheck::http("/health"))
            .build()
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_invalid_id_and_command() {
        assert!(matches!(
            ServiceDefinition::builder("bad id", "/bin/true").build(),
            Err(DomainError::InvalidName(_))
        ));
        assert!(matches!(
            ServiceDefinition::builder("ok", "").build(),
            Err(DomainError::InvalidCommand(_))
        ));
        assert!(ServiceDefinition::builder("ok", "/bin/true")
            .readiness(0, Duration::from_secs(1))
            .build()
            .is_err());
    }
}
