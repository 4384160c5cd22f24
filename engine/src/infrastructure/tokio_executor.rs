//! Tokio Process Executor
//! Real implementation of the ProcessExecutor port using tokio::process
//!
//! Child stdout/stderr are streamed line by line into tracing events on the
//! `svc_engine::service_output` target, labelled with the service id.

use crate::domain::ports::{ProcessExecutor, ProcessExitHandle, SpawnConfig, SpawnResult};
use crate::domain::DomainError;
use async_trait::async_trait;
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, error, info, warn};

/// Tracing target for captured child output
pub const SERVICE_OUTPUT_TARGET: &str = "svc_engine::service_output";

/// Tokio-based process executor
///
/// Each child is placed in its own process group so a terminal Ctrl-C reaches
/// the orchestrator only, which then stops children in order.
#[derive(Debug, Default, Clone)]
pub struct TokioProcessExecutor {}

impl TokioProcessExecutor {
    pub fn new() -> Self {
        Self {}
    }

    fn forward_output<R>(reader: R, service: String, stream: &'static str)
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        tokio::spawn(async move {
            let mut lines = BufReader::new(reader).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        info!(target: SERVICE_OUTPUT_TARGET, service = %service, stream = stream, "{}", line)
                    }
                    Ok(None) => break,
                    Err(e) => {
                        debug!(service = %service, stream = stream, error = %e, "Output stream closed");
                        break;
                    }
                }
            }
        });
    }

    fn create_exit_handle(mut child: Child, service: String, pid: u32) -> ProcessExitHandle {
        let (tx, rx) = tokio::sync::oneshot::channel();

        tokio::spawn(async move {
            let result = match child.wait().await {
                Ok(status) => {
                    let exit_code = exit_code(status);
                    debug!(service = %service, pid = pid, exit_code = exit_code, "Process exited");
                    Ok(exit_code)
                }
                Err(e) => {
                    error!(service = %service, pid = pid, error = %e, "Failed to wait for process");
                    Err(DomainError::spawn_failed(service, e))
                }
            };
            let _ = tx.send(result);
        });

        Box::pin(async move {
            match rx.await {
                Ok(result) => result,
                Err(_) => Err(DomainError::InvalidConfiguration(
                    "process monitor task died unexpectedly".to_string(),
                )),
            }
        })
    }
}

/// Exit code, or 128 + signal number for signal deaths (shell convention)
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    -1
}

#[async_trait]
impl ProcessExecutor for TokioProcessExecutor {
    async fn spawn(&self, config: SpawnConfig) -> Result<SpawnResult, DomainError> {
        debug!(
            service = %config.service,
            command = %config.command,
            args = ?config.args,
            "Spawning process"
        );

        let mut cmd = Command::new(&config.command);
        cmd.args(&config.args)
            .envs(config.env_vars.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(false);

        if let Some(ref dir) = config.working_dir {
            cmd.current_dir(dir);
        }

        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn().map_err(|e| {
            error!(
                service = %config.service,
                command = %config.command,
                error = %e,
                "Failed to spawn process"
            );
            DomainError::spawn_failed(&config.service, e)
        })?;

        let pid = child.id().ok_or_else(|| {
            DomainError::spawn_failed(
                &config.service,
                std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "process exited before its pid could be read",
                ),
            )
        })?;

        if let Some(stdout) = child.stdout.take() {
            Self::forward_output(stdout, config.service.clone(), "stdout");
        }
        if let Some(stderr) = child.stderr.take() {
            Self::forward_output(stderr, config.service.clone(), "stderr");
        }

        let exit_handle = Self::create_exit_handle(child, config.service, pid);
        Ok(SpawnResult {
            pid,
            exit_handle: Some(exit_handle),
        })
    }

    async fn kill(&self, pid: u32, signal: i32) -> Result<(), DomainError> {
        debug!(pid = pid, signal = signal, "Sending signal");

        #[cfg(unix)]
        {
            // Whole process group first, so shell wrappers take their children along
            let mut result = unsafe { libc::kill(-(pid as i32), signal) };
            if result != 0 {
                result = unsafe { libc::kill(pid as i32, signal) };
            }
            if result != 0 {
                let err = std::io::Error::last_os_error();
                warn!(pid = pid, signal = signal, error = %err, "Failed to send signal to process");
                return Err(DomainError::SignalFailed {
                    pid,
                    signal,
                    reason: err.to_string(),
                });
            }
            Ok(())
        }

        #[cfg(not(unix))]
        {
            Err(DomainError::SignalFailed {
                pid,
                signal,
                reason: "signals are not supported on this platform".to_string(),
            })
        }
    }

    async fn is_running(&self, pid: u32) -> Result<bool, DomainError> {
        #[cfg(unix)]
        {
            let result = unsafe { libc::kill(pid as i32, 0) };
            Ok(result == 0)
        }

        #[cfg(not(unix))]
        {
            let _ = pid;
            Ok(false)
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config(service: &str, command: &str, args: &[&str]) -> SpawnConfig {
        SpawnConfig {
            service: service.to_string(),
            command: command.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
            working_dir: None,
            env_vars: vec![],
        }
    }

    #[tokio::test]
    async fn test_spawn_and_observe_exit() {
        let executor = TokioProcessExecutor::new();
        let result = executor
            .spawn(config("sh", "/bin/sh", &["-c", "exit 3"]))
            .await
            .unwrap();
        assert!(result.pid > 0);

        let exit = tokio::time::timeout(Duration::from_secs(5), result.exit_handle.unwrap())
            .await
            .expect("process did not exit")
            .unwrap();
        assert_eq!(exit, 3);
    }

    #[tokio::test]
    async fn test_spawn_invalid_command() {
        let executor = TokioProcessExecutor::new();
        let err = executor
            .spawn(config("ghost", "/nonexistent/command", &[]))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::SpawnFailed { ref service, .. } if service == "ghost"));
    }

    #[tokio::test]
    async fn test_kill_reports_signal_exit_code() {
        let executor = TokioProcessExecutor::new();
        let result = executor
            .spawn(config("sleeper", "/bin/sleep", &["30"]))
            .await
            .unwrap();
        assert!(executor.is_running(result.pid).await.unwrap());

        executor.kill(result.pid, libc::SIGTERM).await.unwrap();
        let exit = tokio::time::timeout(Duration::from_secs(5), result.exit_handle.unwrap())
            .await
            .expect("process did not exit")
            .unwrap();
        assert_eq!(exit, 128 + libc::SIGTERM);
    }

    #[tokio::test]
    async fn test_env_is_passed() {
        let executor = TokioProcessExecutor::new();
        let mut cfg = config("env", "/bin/sh", &["-c", "test \"$PORT\" = 8080"]);
        cfg.env_vars.push(("PORT".to_string(), "8080".to_string()));

        let result = executor.spawn(cfg).await.unwrap();
        let exit = tokio::time::timeout(Duration::from_secs(5), result.exit_handle.unwrap())
            .await
            .expect("process did not exit")
            .unwrap();
        assert_eq!(exit, 0);
    }

    #[test]
    fn test_kill_unknown_pid_fails() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let executor = TokioProcessExecutor::new();
        // PID far above any default pid_max
        let result = rt.block_on(executor.kill(4_000_000, 0));
        assert!(matches!(result, Err(DomainError::SignalFailed { .. })));
    }
}
