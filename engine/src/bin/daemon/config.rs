//! Daemon configuration from environment variables
//!
//! All configuration is read from environment variables with sensible defaults.
//! There is no command-line argument parsing.

use std::env;
use std::net::SocketAddr;
use svc_engine::constants::status::DEFAULT_ADDR;

const DEFAULT_ENABLE_STATUS: bool = true;
const DEFAULT_LOG_LEVEL: &str = "info";

/// Where the status API listens
#[derive(Debug, Clone, PartialEq)]
pub enum StatusTransport {
    Tcp(String),
    Unix(String),
}

/// Daemon configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Service table file
    pub config_file: Option<String>,

    /// Directory of one-service-per-file tables
    pub config_dir: Option<String>,

    /// Status API transport; a socket path wins over a TCP address
    pub status: StatusTransport,

    /// Serve the status API at all
    pub enable_status: bool,

    pub log_level: String,
}

impl DaemonConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let status = match env::var("SVC_ORCH_STATUS_SOCKET") {
            Ok(path) if !path.is_empty() => StatusTransport::Unix(path),
            _ => StatusTransport::Tcp(
                env::var("SVC_ORCH_STATUS_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string()),
            ),
        };

        Self {
            config_file: env::var("SVC_ORCH_CONFIG_FILE").ok(),
            config_dir: env::var("SVC_ORCH_CONFIG_DIR").ok(),
            status,
            enable_status: Self::parse_bool("SVC_ORCH_ENABLE_STATUS", DEFAULT_ENABLE_STATUS),
            log_level: Self::parse_log_level(),
        }
    }

    fn parse_bool(var_name: &str, default: bool) -> bool {
        env::var(var_name)
            .ok()
            .and_then(|s| match s.to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Some(true),
                "false" | "0" | "no" | "off" => Some(false),
                _ => None,
            })
            .unwrap_or(default)
    }

    fn parse_log_level() -> String {
        // SVC_ORCH_LOG_LEVEL > RUST_LOG > default
        env::var("SVC_ORCH_LOG_LEVEL")
            .or_else(|_| env::var("RUST_LOG"))
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        match (&self.config_file, &self.config_dir) {
            (Some(_), Some(_)) => {
                return Err(
                    "Cannot specify both SVC_ORCH_CONFIG_FILE and SVC_ORCH_CONFIG_DIR".to_string(),
                )
            }
            (None, None) => {
                return Err("One of SVC_ORCH_CONFIG_FILE or SVC_ORCH_CONFIG_DIR is required".to_string())
            }
            _ => {}
        }
        if let StatusTransport::Tcp(addr) = &self.status {
            addr.parse::<SocketAddr>()
                .map_err(|e| format!("Invalid SVC_ORCH_STATUS_ADDR '{}': {}", addr, e))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "SVC_ORCH_CONFIG_FILE",
        "SVC_ORCH_CONFIG_DIR",
        "SVC_ORCH_STATUS_ADDR",
        "SVC_ORCH_STATUS_SOCKET",
        "SVC_ORCH_ENABLE_STATUS",
        "SVC_ORCH_LOG_LEVEL",
        "RUST_LOG",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_default_config() {
        clear_env();

        let config = DaemonConfig::from_env();
        assert_eq!(config.status, StatusTransport::Tcp(DEFAULT_ADDR.to_string()));
        assert!(config.enable_status);
        assert_eq!(config.log_level, "info");
        assert!(config.config_file.is_none());
        assert!(config.config_dir.is_none());
    }

    #[test]
    #[serial]
    fn test_socket_takes_precedence() {
        clear_env();
        env::set_var("SVC_ORCH_STATUS_ADDR", "0.0.0.0:9000");
        env::set_var("SVC_ORCH_STATUS_SOCKET", "/run/svc/status.sock");

        let config = DaemonConfig::from_env();
        assert_eq!(config.status, StatusTransport::Unix("/run/svc/status.sock".to_string()));

        env::remove_var("SVC_ORCH_STATUS_SOCKET");
        let config = DaemonConfig::from_env();
        assert_eq!(config.status, StatusTransport::Tcp("0.0.0.0:9000".to_string()));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_bool_parsing() {
        clear_env();
        for val in &["false", "0", "no", "off", "FALSE", "No"] {
            env::set_var("SVC_ORCH_ENABLE_STATUS", val);
            assert!(!DaemonConfig::from_env().enable_status, "Failed for value: {}", val);
        }
        for val in &["true", "1", "yes", "on", "TRUE"] {
            env::set_var("SVC_ORCH_ENABLE_STATUS", val);
            assert!(DaemonConfig::from_env().enable_status, "Failed for value: {}", val);
        }
        env::set_var("SVC_ORCH_ENABLE_STATUS", "maybe");
        assert!(DaemonConfig::from_env().enable_status);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_log_level_priority() {
        clear_env();
        env::set_var("SVC_ORCH_LOG_LEVEL", "debug");
        env::set_var("RUST_LOG", "trace");
        assert_eq!(DaemonConfig::from_env().log_level, "debug");

        env::remove_var("SVC_ORCH_LOG_LEVEL");
        assert_eq!(DaemonConfig::from_env().log_level, "trace");

        env::remove_var("RUST_LOG");
        assert_eq!(DaemonConfig::from_env().log_level, "info");
    }

    #[test]
    #[serial]
    fn test_validation() {
        clear_env();
        let mut config = DaemonConfig::from_env();
        assert!(config.validate().is_err());

        config.config_file = Some("/etc/svc/services.yaml".to_string());
        assert!(config.validate().is_ok());

        config.config_dir = Some("/etc/svc/conf.d".to_string());
        assert!(config.validate().is_err());

        config.config_dir = None;
        config.status = StatusTransport::Tcp("not-an-address".to_string());
        assert!(config.validate().is_err());

        config.status = StatusTransport::Unix("/tmp/status.sock".to_string());
        assert!(config.validate().is_ok());
    }
}
