#[path = "daemon/config.rs"]
mod config;

use config::{DaemonConfig, StatusTransport};
use std::sync::Arc;
use svc_engine::adapters::rest;
use svc_engine::application::{Orchestrator, StartupReport, StatusReport};
use svc_engine::domain::DomainError;
use svc_engine::infrastructure::{
    load_config_dir, load_config_from_path, Config, StandardHealthCheckExecutor,
    TokioProcessExecutor,
};
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let daemon_config = DaemonConfig::from_env();
    init_tracing(&daemon_config.log_level);

    daemon_config.validate()?;

    let config = load_service_table(&daemon_config)?;
    let health_timeout = config.orchestrator.health_check_timeout();
    let orchestrator = Orchestrator::new(
        config.definitions()?,
        Arc::new(TokioProcessExecutor::new()),
        Arc::new(StandardHealthCheckExecutor::new(health_timeout)),
        config.orchestrator,
    )?;
    info!(
        services = orchestrator.registry().len(),
        groups = orchestrator.registry().groups().len(),
        "Service table loaded"
    );

    let status_server = if daemon_config.enable_status {
        Some(spawn_status_server(
            &daemon_config.status,
            orchestrator.clone(),
            orchestrator.shutdown_token(),
        ))
    } else {
        None
    };

    let mut startup = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move { orchestrator.start().await })
    };

    let signal = shutdown_signal();
    tokio::pin!(signal);

    let interrupted = tokio::select! {
        joined = &mut startup => {
            log_startup(joined);
            false
        }
        _ = &mut signal => {
            warn!("Shutdown requested during startup");
            true
        }
    };
    if !interrupted {
        signal.await;
    }

    let report = orchestrator.stop().await;

    if interrupted {
        log_startup(startup.await);
    }
    if let Some(server) = status_server {
        if let Ok(Err(e)) = server.await {
            warn!(error = %e, "Status API exited with error");
        }
    }

    log_final(&report);
    Ok(())
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_service_table(daemon_config: &DaemonConfig) -> Result<Config, Box<dyn std::error::Error>> {
    let config = match (&daemon_config.config_file, &daemon_config.config_dir) {
        (Some(file), _) => {
            info!(path = %file, "Loading service table");
            load_config_from_path(file)?
        }
        (None, Some(dir)) => {
            info!(path = %dir, "Loading service directory");
            load_config_dir(dir)?
        }
        (None, None) => return Err("no service table configured".into()),
    };
    Ok(config)
}

fn spawn_status_server(
    transport: &StatusTransport,
    orchestrator: Orchestrator,
    shutdown: CancellationToken,
) -> JoinHandle<Result<(), rest::ServeError>> {
    let app = rest::build_router(orchestrator);
    let transport = transport.clone();
    let shutdown = async move { shutdown.cancelled().await };

    tokio::spawn(async move {
        let result = match transport {
            StatusTransport::Tcp(addr) => match addr.parse() {
                Ok(addr) => rest::serve_on_tcp(addr, app, shutdown).await,
                Err(e) => Err(Box::new(e) as rest::ServeError),
            },
            #[cfg(unix)]
            StatusTransport::Unix(path) => rest::serve_on_unix_socket(&path, app, shutdown).await,
            #[cfg(not(unix))]
            StatusTransport::Unix(_) => Err("Unix sockets are not supported on this platform".into()),
        };
        if let Err(e) = &result {
            error!(error = %e, "Status API stopped");
        }
        result
    })
}

fn log_startup(joined: Result<Result<StartupReport, DomainError>, JoinError>) {
    let report = match joined {
        Ok(Ok(report)) => report,
        Ok(Err(e)) => {
            error!(error = %e, "Startup aborted");
            return;
        }
        Err(e) => {
            error!(error = %e, "Startup task failed");
            return;
        }
    };
    info!(
        running = report.running.len(),
        failed = report.failed.len(),
        not_started = report.not_started.len(),
        "Startup complete"
    );
    for failed in &report.failed {
        warn!(
            service = %failed.id,
            error = failed.error.as_deref().unwrap_or("unknown"),
            "Service failed to start"
        );
    }
}

fn log_final(report: &StatusReport) {
    let totals = &report.totals;
    info!(
        phase = %report.phase,
        stopped = totals.stopped,
        failed = totals.failed,
        not_started = totals.not_started,
        health_checks = totals.health_checks.performed,
        "Orchestrator stopped"
    );
    for service in report.services.iter().filter(|s| s.last_error.is_some()) {
        warn!(
            service = %service.id,
            status = %service.status,
            restarts = service.restart_count,
            error = service.last_error.as_deref().unwrap_or_default(),
            "Service ended with error"
        );
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("Received SIGINT"),
                    _ = sigterm.recv() => info!("Received SIGTERM"),
                }
                return;
            }
            Err(e) => warn!(error = %e, "Cannot install SIGTERM handler"),
        }
    }
    let _ = tokio::signal::ctrl_c().await;
    info!("Received SIGINT");
}
