//! Health monitor
//! One independent probe loop per running service; results go to the orchestrator
//!
//! Services without a health check are never monitored here and rely on
//! process-exit detection alone.

use super::retry::{retry_with_interval, Attempt, RetryError, RetryPolicy};
use crate::domain::events::{EventSender, HealthCheckEvent, SupervisionEvent};
use crate::domain::ports::HealthCheckExecutor;
use crate::domain::{HealthStatus, ServiceDefinition, ServiceId};
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy)]
pub struct HealthMonitorSettings {
    /// Time between two checks of one service
    pub interval: Duration,
    /// Failing probes within one check before it counts as unhealthy
    pub failure_threshold: u32,
    /// Delay between those probes
    pub retry_interval: Duration,
}

struct Monitor {
    generation: u64,
    token: CancellationToken,
    task: JoinHandle<()>,
}

pub struct HealthMonitor {
    health: Arc<dyn HealthCheckExecutor>,
    events: EventSender,
    settings: HealthMonitorSettings,
    monitors: Mutex<HashMap<ServiceId, Monitor>>,
    root: CancellationToken,
}

impl HealthMonitor {
    pub fn new(
        health: Arc<dyn HealthCheckExecutor>,
        events: EventSender,
        settings: HealthMonitorSettings,
    ) -> Self {
        Self {
            health,
            events,
            settings,
            monitors: Mutex::new(HashMap::new()),
            root: CancellationToken::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ServiceId, Monitor>> {
        self.monitors.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Start the probe loop for one process generation of `definition`.
    ///
    /// Replaces any loop already running for the service. Returns false when
    /// the service has no health check or monitoring was shut down.
    pub fn start_monitoring(
        &self,
        definition: &ServiceDefinition,
        generation: u64,
        pid: Option<u32>,
    ) -> bool {
        if definition.health_check().is_none() || self.root.is_cancelled() {
            return false;
        }

        let id = definition.id().clone();
        let token = self.root.child_token();
        let task = tokio::spawn(Self::monitor_loop(
            definition.clone(),
            generation,
            pid,
            self.health.clone(),
            self.events.clone(),
            self.settings,
            token.clone(),
        ));

        if let Some(previous) = self.lock().insert(
            id.clone(),
            Monitor {
                generation,
                token,
                task,
            },
        ) {
            previous.token.cancel();
        }
        debug!(service = %id, generation = generation, "Health monitoring started");
        true
    }

    /// Stop the probe loop of `id`, if any
    pub fn stop_monitoring(&self, id: &ServiceId) {
        if let Some(monitor) = self.lock().remove(id) {
            monitor.token.cancel();
            debug!(service = %id, generation = monitor.generation, "Health monitoring stopped");
        }
    }

    /// Cancel every probe loop and wait for them to wind down.
    /// No monitoring can be started afterwards.
    pub async fn cancel_all(&self) {
        self.root.cancel();
        let monitors: Vec<Monitor> = self.lock().drain().map(|(_, m)| m).collect();
        let count = monitors.len();
        join_all(monitors.into_iter().map(|m| m.task)).await;
        info!(monitors = count, "Health monitoring cancelled");
    }

    pub fn is_monitoring(&self, id: &ServiceId) -> bool {
        self.lock().contains_key(id)
    }

    pub fn active_count(&self) -> usize {
        self.lock().len()
    }

    async fn monitor_loop(
        definition: ServiceDefinition,
        generation: u64,
        pid: Option<u32>,
        health: Arc<dyn HealthCheckExecutor>,
        events: EventSender,
        settings: HealthMonitorSettings,
        token: CancellationToken,
    ) {
        let id = definition.id().clone();
        let policy = RetryPolicy::new(settings.failure_threshold, settings.retry_interval);
        let health = &health;
        let definition = &definition;

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = sleep(settings.interval) => {}
            }

            let result = retry_with_interval(policy, &token, |_| async move {
                match health.check(definition, pid).await {
                    Ok(HealthStatus::Healthy) => Attempt::Ready(()),
                    Ok(status) => Attempt::NotYet(format!("health check reported {}", status)),
                    Err(e) => Attempt::NotYet(e.to_string()),
                }
            })
            .await;

            let (healthy, detail) = match result {
                Ok(()) => (true, None),
                Err(RetryError::Cancelled) => break,
                Err(RetryError::Exhausted { last, .. }) => (false, last),
                Err(RetryError::Aborted(reason)) => (false, Some(reason)),
            };

            if healthy {
                debug!(service = %id, generation = generation, "Health check passed");
            } else {
                warn!(
                    service = %id,
                    generation = generation,
                    detail = detail.as_deref().unwrap_or(""),
                    "Health check failed"
                );
            }

            let event = SupervisionEvent::HealthChecked(HealthCheckEvent {
                service_id: id.clone(),
                generation,
                healthy,
                detail,
                at: Instant::now(),
            });
            if events.send(event).is_err() {
                debug!(service = %id, "Event channel closed, stopping health monitor");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::{self, EventReceiver};
    use crate::domain::ports::ScriptedHealthCheckExecutor;
    use crate::domain::HealthCheck;

    fn settings(threshold: u32) -> HealthMonitorSettings {
        HealthMonitorSettings {
            interval: Duration::from_secs(30),
            failure_threshold: threshold,
            retry_interval: Duration::from_secs(1),
        }
    }

    fn web() -> ServiceDefinition {
        ServiceDefinition::builder("web", "/bin/web")
            .port(8080)
            .health_check(HealthCheck::http("/health"))
            .build()
            .unwrap()
    }

    async fn next_check(rx: &mut EventReceiver) -> HealthCheckEvent {
        match rx.recv().await {
            Some(SupervisionEvent::HealthChecked(e)) => e,
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_reports_each_tick() {
        let health = ScriptedHealthCheckExecutor::new();
        health.push("web", [HealthStatus::Healthy, HealthStatus::Unhealthy]);
        let (tx, mut rx) = events::channel();
        let monitor = HealthMonitor::new(Arc::new(health.clone()), tx, settings(1));

        let start = Instant::now();
        assert!(monitor.start_monitoring(&web(), 7, Some(100)));

        let first = next_check(&mut rx).await;
        assert!(first.healthy);
        assert_eq!(first.generation, 7);
        assert!(start.elapsed() >= Duration::from_secs(30));

        let second = next_check(&mut rx).await;
        assert!(!second.healthy);
        assert_eq!(second.detail.as_deref(), Some("health check reported unhealthy"));
        assert!(start.elapsed() >= Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_threshold_retries_within_tick() {
        let health = ScriptedHealthCheckExecutor::new();
        health.push("web", [HealthStatus::Unhealthy, HealthStatus::Unhealthy]);
        let (tx, mut rx) = events::channel();
        let monitor = HealthMonitor::new(Arc::new(health.clone()), tx, settings(3));
        monitor.start_monitoring(&web(), 1, None);

        // Third probe of the tick succeeds
        assert!(next_check(&mut rx).await.healthy);
        assert_eq!(health.check_count("web"), 3);
    }

    #[tokio::test]
    async fn test_service_without_health_check_not_monitored() {
        let health = ScriptedHealthCheckExecutor::new();
        let (tx, _rx) = events::channel();
        let monitor = HealthMonitor::new(Arc::new(health), tx, settings(1));
        let def = ServiceDefinition::builder("worker", "/bin/worker")
            .build()
            .unwrap();

        assert!(!monitor.start_monitoring(&def, 1, None));
        assert!(!monitor.is_monitoring(def.id()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_replaces_loop() {
        let health = ScriptedHealthCheckExecutor::new();
        let (tx, mut rx) = events::channel();
        let monitor = HealthMonitor::new(Arc::new(health.clone()), tx, settings(1));

        monitor.start_monitoring(&web(), 1, None);
        monitor.start_monitoring(&web(), 2, None);
        assert_eq!(monitor.active_count(), 1);

        let event = next_check(&mut rx).await;
        assert_eq!(event.generation, 2);
        // Only one loop probes the service
        assert_eq!(health.check_count("web"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all_stops_probes() {
        let health = ScriptedHealthCheckExecutor::new();
        let (tx, mut rx) = events::channel();
        let monitor = HealthMonitor::new(Arc::new(health.clone()), tx, settings(1));

        monitor.start_monitoring(&web(), 1, None);
        monitor.cancel_all().await;
        assert_eq!(monitor.active_count(), 0);
        assert!(!monitor.start_monitoring(&web(), 2, None));

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(health.check_count("web"), 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_monitoring() {
        let health = ScriptedHealthCheckExecutor::new();
        let (tx, _rx) = events::channel();
        let monitor = HealthMonitor::new(Arc::new(health.clone()), tx, settings(1));

        monitor.start_monitoring(&web(), 1, None);
        assert!(monitor.is_monitoring(web().id()));
        monitor.stop_monitoring(web().id());
        assert!(!monitor.is_monitoring(web().id()));

        tokio::time::sleep(Duration::from_secs(90)).await;
        assert_eq!(health.check_count("web"), 0);
    }
}
