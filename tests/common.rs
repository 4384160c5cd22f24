//! Shared test utilities for E2E tests
//!
//! Every test drives a real `Orchestrator` over real child processes
//! (`/bin/sh`, `sleep`) through `TokioProcessExecutor`, with HTTP health
//! checks answered by an in-process server on an ephemeral port.
//!
//! ## Logging
//!
//! A tracing subscriber is installed once per test binary (via `#[ctor]`),
//! writing through the test harness so output only shows for failing tests.
//! The filter comes from `SVC_E2E_LOG` and defaults to `warn`.
//!
//! ## Usage Pattern
//!
//! ```rust,ignore
//! #[tokio::test]
//! async fn my_test() {
//!     let server = HealthServer::start().await;
//!     let api = sh_service("api", "sleep 30").port(server.port()).health_check(HealthCheck::http("/health"));
//!     let orchestrator = orchestrator(vec![api.build().unwrap()], fast_settings());
//!     orchestrator.start().await.unwrap();
//!     // ...
//!     orchestrator.stop().await;
//! }
//! ```

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use svc_engine::application::{Orchestrator, OrchestratorSettings};
use svc_engine::domain::{ServiceDefinition, ServiceDefinitionBuilder, ServiceStatus};
use svc_engine::infrastructure::{StandardHealthCheckExecutor, TokioProcessExecutor};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

#[ctor::ctor]
fn init_tracing() {
    let filter = EnvFilter::try_from_env("SVC_E2E_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Settings scaled down so recovery scenarios finish in seconds
pub fn fast_settings() -> OrchestratorSettings {
    OrchestratorSettings {
        readiness_max_attempts: 50,
        readiness_interval_ms: 100,
        health_check_interval_sec: 1,
        health_check_timeout_sec: 1,
        health_failure_threshold: 1,
        health_retry_interval_ms: 100,
        restart_ceiling: 3,
        restart_cooldown_sec: 0,
        stop_grace_period_sec: 2,
        kill_wait_sec: 2,
    }
}

/// A service running `script` under `/bin/sh -c`
pub fn sh_service(id: &str, script: &str) -> ServiceDefinitionBuilder {
    ServiceDefinition::builder(id, "/bin/sh").args(["-c", script])
}

/// Orchestrator over real processes and real probes
pub fn orchestrator(
    definitions: Vec<ServiceDefinition>,
    settings: OrchestratorSettings,
) -> Orchestrator {
    Orchestrator::new(
        definitions,
        Arc::new(TokioProcessExecutor::new()),
        Arc::new(StandardHealthCheckExecutor::new(settings.health_check_timeout())),
        settings,
    )
    .expect("valid service table")
}

/// Poll `condition` every 50ms until it holds or `timeout` passes
pub async fn wait_for<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    condition()
}

/// Wait until `id` reaches `status`
pub async fn wait_for_status(
    orchestrator: &Orchestrator,
    id: &str,
    status: ServiceStatus,
    timeout: Duration,
) -> bool {
    wait_for(timeout, || {
        orchestrator.state(id).map(|s| s.status()) == Some(status)
    })
    .await
}

/// Whether a pid still names a live process
pub fn pid_alive(pid: u32) -> bool {
    std::process::Command::new("kill")
        .args(["-0", &pid.to_string()])
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Run `future` with a hard deadline so a hung scenario fails instead of blocking CI
pub async fn within<F: Future>(timeout: Duration, future: F) -> F::Output {
    tokio::time::timeout(timeout, future)
        .await
        .expect("scenario timed out")
}

/// Minimal HTTP server whose every response is 200 or 503 depending on a switch
pub struct HealthServer {
    port: u16,
    healthy: Arc<AtomicBool>,
    hits: Arc<AtomicUsize>,
    task: JoinHandle<()>,
}

impl HealthServer {
    /// Start serving healthy responses on an ephemeral port
    pub async fn start() -> Self {
        Self::start_with(true).await
    }

    pub async fn start_with(healthy: bool) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind health server");
        let port = listener.local_addr().expect("local addr").port();
        let healthy = Arc::new(AtomicBool::new(healthy));
        let hits = Arc::new(AtomicUsize::new(0));

        let task = {
            let healthy = healthy.clone();
            let hits = hits.clone();
            tokio::spawn(async move {
                while let Ok((mut stream, _)) = listener.accept().await {
                    let healthy = healthy.load(Ordering::SeqCst);
                    hits.fetch_add(1, Ordering::SeqCst);
                    tokio::spawn(async move {
                        let mut request = Vec::new();
                        let mut buf = [0u8; 1024];
                        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                            match stream.read(&mut buf).await {
                                Ok(0) | Err(_) => return,
                                Ok(n) => request.extend_from_slice(&buf[..n]),
                            }
                        }
                        let response: &[u8] = if healthy {
                            b"HTTP/1.1 200 OK\r\ncontent-length: 2\r\nconnection: close\r\n\r\nok"
                        } else {
                            b"HTTP/1.1 503 Service Unavailable\r\ncontent-length: 4\r\nconnection: close\r\n\r\ndown"
                        };
                        let _ = stream.write_all(response).await;
                        let _ = stream.shutdown().await;
                    });
                }
            })
        };

        Self {
            port,
            healthy,
            hits,
            task,
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    /// Requests received so far
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

impl Drop for HealthServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}
