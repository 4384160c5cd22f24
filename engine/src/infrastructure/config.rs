//! Configuration loading from YAML files
//!
//! Two layouts are supported:
//! - a single file with an optional `orchestrator:` block and a `services:` map keyed by id
//! - a directory of `*.yaml`/`*.yml` files, one service per file, id taken from the file stem

use crate::application::OrchestratorSettings;
use crate::domain::{DomainError, HealthCheck, ServiceDefinition};
use crate::infrastructure::probes::{ExecProbe, TcpProbe};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::ffi::OsStr;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Top-level configuration structure
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub orchestrator: OrchestratorSettings,

    #[serde(default)]
    pub services: BTreeMap<String, ServiceConfig>,
}

/// Service configuration from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    pub command: String,

    #[serde(default)]
    pub display_name: Option<String>,

    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default)]
    pub env: BTreeMap<String, String>,

    #[serde(default)]
    pub working_dir: Option<String>,

    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub secondary_port: Option<u16>,

    #[serde(default)]
    pub priority: i32,

    #[serde(default)]
    pub depends_on: Vec<String>,

    #[serde(default)]
    pub health_check: Option<HealthCheckConfig>,

    #[serde(default)]
    pub readiness: Option<ReadinessConfig>,

    #[serde(default)]
    pub stop_grace_period_sec: Option<u64>,
}

/// Health check configuration from YAML
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum HealthCheckConfig {
    Http {
        #[serde(default = "default_http_path")]
        path: String,
    },
    Tcp {
        #[serde(default)]
        host: Option<String>,
        #[serde(default)]
        port: Option<u16>,
    },
    Exec {
        command: String,
        #[serde(default)]
        args: Vec<String>,
    },
}

fn default_http_path() -> String {
    "/".to_string()
}

/// Per-service readiness override
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ReadinessConfig {
    #[serde(default)]
    pub max_attempts: Option<u32>,

    #[serde(default)]
    pub interval_ms: Option<u64>,
}

impl HealthCheckConfig {
    fn to_health_check(&self, probe_timeout: Duration) -> HealthCheck {
        match self {
            HealthCheckConfig::Http { path } => HealthCheck::http(path.clone()),
            HealthCheckConfig::Tcp { host, port } => HealthCheck::custom(
                TcpProbe::new(host.as_deref().unwrap_or("127.0.0.1"), *port)
                    .with_timeout(probe_timeout),
            ),
            HealthCheckConfig::Exec { command, args } => HealthCheck::custom(
                ExecProbe::new(command.clone(), args.clone()).with_timeout(probe_timeout),
            ),
        }
    }
}

impl ServiceConfig {
    /// Build the validated domain definition for service `id`
    pub fn to_definition(
        &self,
        id: &str,
        settings: &OrchestratorSettings,
    ) -> Result<ServiceDefinition, DomainError> {
        let mut builder = ServiceDefinition::builder(id, self.command.clone())
            .args(self.args.iter().cloned())
            .priority(self.priority)
            .dependencies(self.depends_on.iter().cloned());

        if let Some(ref name) = self.display_name {
            builder = builder.display_name(name.clone());
        }
        for (key, value) in &self.env {
            builder = builder.env(key.clone(), value.clone());
        }
        if let Some(ref dir) = self.working_dir {
            builder = builder.working_dir(dir.clone());
        }
        if let Some(port) = self.port {
            builder = builder.port(port);
        }
        if let Some(port) = self.secondary_port {
            builder = builder.secondary_port(port);
        }
        if let Some(ref check) = self.health_check {
            builder = builder.health_check(check.to_health_check(settings.health_check_timeout()));
        }
        if let Some(ref readiness) = self.readiness {
            builder = builder.readiness(
                readiness
                    .max_attempts
                    .unwrap_or(settings.readiness_max_attempts),
                Duration::from_millis(
                    readiness
                        .interval_ms
                        .unwrap_or(settings.readiness_interval_ms),
                ),
            );
        }
        if let Some(secs) = self.stop_grace_period_sec {
            builder = builder.stop_grace_period(Duration::from_secs(secs));
        }

        builder.build()
    }
}

impl Config {
    /// Domain definitions for every configured service, in id order
    pub fn definitions(&self) -> Result<Vec<ServiceDefinition>, DomainError> {
        self.services
            .iter()
            .map(|(id, service)| service.to_definition(id, &self.orchestrator))
            .collect()
    }

    /// Parse a whole-table YAML document
    pub fn parse(contents: &str) -> Result<Self, DomainError> {
        validate_no_duplicate_service_ids(contents)?;
        serde_yaml::from_str(contents)
            .map_err(|e| DomainError::InvalidConfiguration(format!("failed to parse YAML: {}", e)))
    }
}

/// YAML mappings keep only the last of two equal keys; catch that before parsing
fn validate_no_duplicate_service_ids(yaml_content: &str) -> Result<(), DomainError> {
    let mut seen = HashSet::new();
    let mut services_indent: Option<usize> = None;
    let mut entry_indent: Option<usize> = None;

    for line in yaml_content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let indent = line.len() - line.trim_start().len();

        if trimmed == "services:" {
            services_indent = Some(indent);
            entry_indent = None;
            continue;
        }

        let Some(base) = services_indent else {
            continue;
        };
        if indent <= base {
            services_indent = None;
            continue;
        }

        let level = *entry_indent.get_or_insert(indent);
        if indent == level && !trimmed.starts_with('-') {
            if let Some((key, _)) = trimmed.split_once(':') {
                let key = key.trim().trim_matches(|c| c == '"' || c == '\'');
                if !key.is_empty() && !seen.insert(key.to_string()) {
                    return Err(DomainError::DuplicateService(key.to_string()));
                }
            }
        }
    }
    Ok(())
}

/// Load a single configuration file
pub fn load_config_from_path(path: impl AsRef<Path>) -> Result<Config, DomainError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|e| {
        DomainError::InvalidConfiguration(format!(
            "failed to read config file '{}': {}",
            path.display(),
            e
        ))
    })?;
    let config = Config::parse(&contents)?;
    debug!(path = %path.display(), services = config.services.len(), "Loaded configuration file");
    Ok(config)
}

/// Load one service per YAML file from a directory.
///
/// Files are read in file-name order; any unreadable or invalid file fails
/// the whole load. Orchestrator settings keep their defaults.
pub fn load_config_dir(dir: impl AsRef<Path>) -> Result<Config, DomainError> {
    let dir = dir.as_ref();
    let mut entries: Vec<_> = std::fs::read_dir(dir)
        .map_err(|e| {
            DomainError::InvalidConfiguration(format!(
                "failed to read config directory '{}': {}",
                dir.display(),
                e
            ))
        })?
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            let path = entry.path();
            path.is_file()
                && (path.extension() == Some(OsStr::new("yaml"))
                    || path.extension() == Some(OsStr::new("yml")))
        })
        .collect();
    entries.sort_by_key(|e| e.file_name());

    let mut config = Config::default();
    for entry in entries {
        let path = entry.path();
        let id = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| {
                DomainError::InvalidConfiguration(format!("invalid file name: {}", path.display()))
            })?
            .to_string();

        let contents = std::fs::read_to_string(&path).map_err(|e| {
            DomainError::InvalidConfiguration(format!(
                "failed to read '{}': {}",
                path.display(),
                e
            ))
        })?;
        let service: ServiceConfig = serde_yaml::from_str(&contents).map_err(|e| {
            DomainError::InvalidConfiguration(format!(
                "failed to parse '{}': {}",
                path.display(),
                e
            ))
        })?;

        // foo.yaml next to foo.yml
        if config.services.insert(id.clone(), service).is_some() {
            return Err(DomainError::DuplicateService(id));
        }
    }

    debug!(dir = %dir.display(), services = config.services.len(), "Loaded configuration directory");
    Ok(config)
}
