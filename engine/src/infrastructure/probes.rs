//! Built-in custom predicates: TCP connect and command execution

use crate::domain::{HealthPredicate, ProbeContext, ProbeError};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::process::Command;
use tracing::debug;

/// Healthy once a TCP connection can be opened.
/// Without an explicit port the service's own port is used.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    host: String,
    port: Option<u16>,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(host: impl Into<String>, port: Option<u16>) -> Self {
        Self {
            host: host.into(),
            port,
            timeout: Duration::from_secs(crate::constants::health_check::DEFAULT_TIMEOUT),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl HealthPredicate for TcpProbe {
    fn name(&self) -> &str {
        "tcp"
    }

    async fn probe(&self, ctx: &ProbeContext) -> Result<bool, ProbeError> {
        let port = self.port.or(ctx.port).ok_or_else(|| {
            ProbeError::Fatal(format!("no port to probe for service '{}'", ctx.service))
        })?;
        let addr = format!("{}:{}", self.host, port);

        match tokio::time::timeout(self.timeout, TcpStream::connect(&addr)).await {
            Ok(Ok(_stream)) => Ok(true),
            Ok(Err(e)) => {
                debug!(service = %ctx.service, addr = %addr, error = %e, "TCP probe refused");
                Ok(false)
            }
            Err(_) => Err(ProbeError::Transient(format!("connect to {} timed out", addr))),
        }
    }
}

/// Healthy when the command exits with status 0.
/// `PORT` and `SERVICE_PID` are exported to the command.
#[derive(Debug, Clone)]
pub struct ExecProbe {
    command: String,
    args: Vec<String>,
    timeout: Duration,
}

impl ExecProbe {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            timeout: Duration::from_secs(crate::constants::health_check::DEFAULT_TIMEOUT),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl HealthPredicate for ExecProbe {
    fn name(&self) -> &str {
        "exec"
    }

    async fn probe(&self, ctx: &ProbeContext) -> Result<bool, ProbeError> {
        let mut cmd = Command::new(&self.command);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        if let Some(port) = ctx.port {
            cmd.env("PORT", port.to_string());
        }
        if let Some(pid) = ctx.pid {
            cmd.env("SERVICE_PID", pid.to_string());
        }

        // A probe command that cannot run at all will not start working later
        let mut child = cmd.spawn().map_err(|e| {
            ProbeError::Fatal(format!("cannot run probe '{}': {}", self.command, e))
        })?;

        match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(Ok(status)) => {
                debug!(service = %ctx.service, command = %self.command, code = ?status.code(), "Exec probe finished");
                Ok(status.success())
            }
            Ok(Err(e)) => Err(ProbeError::Transient(e.to_string())),
            Err(_) => Err(ProbeError::Transient(format!(
                "probe '{}' timed out after {}s",
                self.command,
                self.timeout.as_secs()
            ))),
        }
    }
}
