//! Orchestrator
//! Starts services group by group, reacts to supervision events and shuts everything down
//!
//! The orchestrator is the only writer of `ServiceState`. Supervisors and
//! monitors report through the event channel; the event loop consumes it and
//! applies the recovery policy.

use super::settings::OrchestratorSettings;
use super::status::{
    FailedService, HealthCheckTotals, LastHealthCheck, OrchestratorPhase, ServiceStatusEntry,
    StartupReport, StatusReport, StatusTotals,
};
use crate::domain::events::{
    self, EventReceiver, EventSender, FailureEvent, FailureKind, HealthCheckEvent,
    SupervisionEvent,
};
use crate::domain::ports::{HealthCheckExecutor, ProcessExecutor};
use crate::domain::services::{
    HealthMonitor, ProcessHandle, ProcessSupervisor, ReadinessProber, RecoveryAction,
    RecoveryPolicy, RetryPolicy, ServiceRegistry,
};
use crate::domain::{DomainError, ServiceDefinition, ServiceId, ServiceState, ServiceStatus};
use futures::future::join_all;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[derive(Default)]
struct HealthStats {
    performed: AtomicU64,
    passed: AtomicU64,
    failed: AtomicU64,
}

impl HealthStats {
    fn record(&self, healthy: bool) {
        self.performed.fetch_add(1, Ordering::Relaxed);
        if healthy {
            self.passed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn totals(&self) -> HealthCheckTotals {
        HealthCheckTotals {
            performed: self.performed.load(Ordering::Relaxed),
            passed: self.passed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

struct Inner {
    registry: ServiceRegistry,
    settings: OrchestratorSettings,
    states: RwLock<HashMap<ServiceId, ServiceState>>,
    seq: AtomicU64,
    phase: Mutex<OrchestratorPhase>,
    supervisor: ProcessSupervisor,
    prober: ReadinessProber,
    monitor: HealthMonitor,
    policy: RecoveryPolicy,
    events: EventSender,
    receiver: Mutex<Option<EventReceiver>>,
    shutdown: CancellationToken,
    startup: tokio::sync::Mutex<()>,
    stop_report: tokio::sync::Mutex<Option<StatusReport>>,
    tasks: Mutex<JoinSet<()>>,
    restarting: Mutex<HashSet<ServiceId>>,
    cooling_down: Mutex<HashSet<ServiceId>>,
    health_stats: HealthStats,
}

/// Cheap to clone; all clones drive the same set of services.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

impl Orchestrator {
    /// Validate the service table and settings and prepare the components.
    /// Nothing is spawned until `start()`.
    pub fn new(
        definitions: Vec<ServiceDefinition>,
        executor: Arc<dyn ProcessExecutor>,
        health: Arc<dyn HealthCheckExecutor>,
        settings: OrchestratorSettings,
    ) -> Result<Self, DomainError> {
        settings.validate()?;
        let registry = ServiceRegistry::new(definitions)?;
        let (tx, rx) = events::channel();

        let states = registry
            .ids()
            .map(|id| (id.clone(), ServiceState::new()))
            .collect();

        info!(
            services = registry.len(),
            groups = registry.groups().len(),
            "Orchestrator configured"
        );

        let inner = Inner {
            supervisor: ProcessSupervisor::new(executor, tx.clone(), settings.kill_wait()),
            prober: ReadinessProber::new(health.clone()),
            monitor: HealthMonitor::new(health, tx.clone(), settings.health_monitor()),
            policy: RecoveryPolicy::new(settings.restart_ceiling, settings.restart_cooldown()),
            registry,
            settings,
            states: RwLock::new(states),
            seq: AtomicU64::new(0),
            phase: Mutex::new(OrchestratorPhase::Idle),
            events: tx,
            receiver: Mutex::new(Some(rx)),
            shutdown: CancellationToken::new(),
            startup: tokio::sync::Mutex::new(()),
            stop_report: tokio::sync::Mutex::new(None),
            tasks: Mutex::new(JoinSet::new()),
            restarting: Mutex::new(HashSet::new()),
            cooling_down: Mutex::new(HashSet::new()),
            health_stats: HealthStats::default(),
        };

        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.inner.registry
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.inner.settings
    }

    pub fn phase(&self) -> OrchestratorPhase {
        *lock(&self.inner.phase)
    }

    /// Snapshot of one service's runtime state
    pub fn state(&self, id: &str) -> Option<ServiceState> {
        self.inner.states_read().get(id).cloned()
    }

    /// Bring every service up, one priority group at a time.
    ///
    /// Only fails when called twice or after `stop()`. Individual service
    /// failures are recorded in their state and listed in the report.
    pub async fn start(&self) -> Result<StartupReport, DomainError> {
        let inner = &self.inner;
        let _startup = inner.startup.lock().await;
        {
            let phase = lock(&inner.phase);
            if *phase != OrchestratorPhase::Idle {
                return Err(DomainError::InvalidPhase(phase.to_string()));
            }
        }
        // Exits during startup must reach the dependency gate of later groups
        inner.spawn_event_loop();

        let began = Instant::now();
        'groups: for group in inner.registry.groups() {
            if !inner.advance_phase(OrchestratorPhase::StartingGroup(group.priority)) {
                break;
            }
            info!(
                priority = group.priority,
                services = group.members().count(),
                "Starting priority group"
            );

            for wave in &group.waves {
                if inner.shutdown.is_cancelled() {
                    break 'groups;
                }

                let mut ready = Vec::with_capacity(wave.len());
                for id in wave {
                    let definition = inner.registry.lookup(id.as_str())?;
                    match inner.unsatisfied_dependency(definition) {
                        Some(dependency) => inner.fail_unstarted(definition, dependency),
                        None => ready.push(definition),
                    }
                }
                join_all(ready.into_iter().map(|d| inner.start_service(d))).await;
            }
        }

        if inner.advance_phase(OrchestratorPhase::Monitoring) {
            inner.begin_monitoring();
        }

        let report = inner.startup_report();
        info!(
            running = report.running.len(),
            failed = report.failed.len(),
            not_started = report.not_started.len(),
            elapsed_ms = began.elapsed().as_millis() as u64,
            "Startup complete"
        );
        Ok(report)
    }

    /// Cancel monitoring, terminate every process and report the final status.
    ///
    /// Waits for an in-flight `start()` to wind down first. Calling it again
    /// returns the first call's report.
    pub async fn stop(&self) -> StatusReport {
        let inner = &self.inner;
        let mut cached = inner.stop_report.lock().await;
        if let Some(report) = cached.as_ref() {
            debug!("Orchestrator already stopped");
            return report.clone();
        }

        info!("Stopping orchestrator");
        inner.set_phase(OrchestratorPhase::Stopping);
        inner.monitor.cancel_all().await;
        inner.shutdown.cancel();
        inner.supervisor.close();

        drop(inner.startup.lock().await);
        inner.drain_tasks().await;

        let results = inner
            .supervisor
            .terminate_all(|id| inner.grace_for(id))
            .await;
        let mut failures = HashMap::new();
        for (id, result) in results {
            match result {
                Ok(outcome) => debug!(service = %id, outcome = ?outcome, "Process terminated"),
                Err(e) => {
                    error!(service = %id, error = %e, "Failed to terminate process");
                    failures.insert(id, e.to_string());
                }
            }
        }
        inner.settle_after_stop(&failures);
        inner.set_phase(OrchestratorPhase::Stopped);

        let report = inner.report();
        info!(
            stopped = report.totals.stopped,
            failed = report.totals.failed,
            not_started = report.totals.not_started,
            "Orchestrator stopped"
        );
        *cached = Some(report.clone());
        report
    }

    pub fn status(&self) -> StatusReport {
        self.inner.report()
    }

    pub fn service_status(&self, id: &str) -> Result<ServiceStatusEntry, DomainError> {
        let definition = self.inner.registry.lookup(id)?;
        let states = self.inner.states_read();
        let state = states
            .get(id)
            .ok_or_else(|| DomainError::ServiceNotFound(id.to_string()))?;
        Ok(status_entry(definition, state, Instant::now()))
    }

    /// Cancelled once `stop()` begins
    pub fn shutdown_token(&self) -> CancellationToken {
        self.inner.shutdown.clone()
    }
}

impl Inner {
    // ===== State access =====

    fn states_read(&self) -> RwLockReadGuard<'_, HashMap<ServiceId, ServiceState>> {
        self.states.read().unwrap_or_else(|e| e.into_inner())
    }

    fn states_write(&self) -> RwLockWriteGuard<'_, HashMap<ServiceId, ServiceState>> {
        self.states.write().unwrap_or_else(|e| e.into_inner())
    }

    fn update<R>(&self, id: &ServiceId, f: impl FnOnce(&mut ServiceState) -> R) -> Option<R> {
        self.states_write().get_mut(id).map(f)
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn transition(&self, state: &mut ServiceState, id: &ServiceId, next: ServiceStatus) -> bool {
        let from = state.status();
        match state.transition_to(next, self.next_seq(), Instant::now()) {
            Ok(()) => {
                info!(service = %id, from = %from, to = %next, "Service status changed");
                true
            }
            Err(e) => {
                warn!(service = %id, error = %e, "Ignoring status change");
                false
            }
        }
    }

    fn set_phase(&self, phase: OrchestratorPhase) {
        *lock(&self.phase) = phase;
        debug!(phase = %phase, "Orchestrator phase changed");
    }

    fn phase_is(&self, phase: OrchestratorPhase) -> bool {
        *lock(&self.phase) == phase
    }

    /// Move forward unless shutdown already took over
    fn advance_phase(&self, next: OrchestratorPhase) -> bool {
        let mut phase = lock(&self.phase);
        if matches!(
            *phase,
            OrchestratorPhase::Stopping | OrchestratorPhase::Stopped
        ) {
            return false;
        }
        *phase = next;
        debug!(phase = %next, "Orchestrator phase changed");
        true
    }

    fn readiness_policy(&self, definition: &ServiceDefinition) -> RetryPolicy {
        let defaults = self.settings.readiness_policy();
        RetryPolicy::new(
            definition
                .readiness_max_attempts()
                .unwrap_or(defaults.max_attempts),
            definition.readiness_interval().unwrap_or(defaults.interval),
        )
    }

    fn grace_period(&self, definition: &ServiceDefinition) -> Duration {
        definition
            .stop_grace_period()
            .unwrap_or_else(|| self.settings.stop_grace_period())
    }

    fn grace_for(&self, id: &ServiceId) -> Duration {
        self.registry
            .lookup(id.as_str())
            .map(|d| self.grace_period(d))
            .unwrap_or_else(|_| self.settings.stop_grace_period())
    }

    // ===== Startup =====

    fn unsatisfied_dependency<'a>(&self, definition: &'a ServiceDefinition) -> Option<&'a ServiceId> {
        let states = self.states_read();
        let missing = definition.dependencies().iter().find(|dependency| {
            states.get(*dependency).map(|s| s.status()) != Some(ServiceStatus::Running)
        });
        missing
    }

    fn fail_unstarted(&self, definition: &ServiceDefinition, dependency: &ServiceId) {
        let id = definition.id();
        let err = DomainError::UnsatisfiedDependency {
            service: id.to_string(),
            dependency: dependency.to_string(),
        };
        warn!(service = %id, dependency = %dependency, "Dependency not running, not starting service");
        self.update(id, |state| {
            if let Err(e) = state.fail_before_start(err.to_string(), self.next_seq(), Instant::now())
            {
                warn!(service = %id, error = %e, "Ignoring status change");
            }
        });
    }

    async fn start_service(&self, definition: &ServiceDefinition) {
        let id = definition.id();
        let starting = self
            .update(id, |s| self.transition(s, id, ServiceStatus::Starting))
            .unwrap_or(false);
        if !starting {
            return;
        }

        let handle = match self.supervisor.spawn(definition).await {
            Ok(handle) => handle,
            Err(e) => {
                self.fail_service(id, &e);
                return;
            }
        };
        self.update(id, |s| {
            s.attach_process(handle.pid(), handle.generation(), Instant::now())
        });

        let ready = self
            .prober
            .wait_until_ready(
                definition,
                &handle,
                self.readiness_policy(definition),
                &self.shutdown,
            )
            .await;
        match ready {
            Ok(_) => {
                self.update(id, |s| self.transition(s, id, ServiceStatus::Running));
            }
            Err(e) => {
                self.discard_process(definition, &handle).await;
                self.fail_service(id, &e);
            }
        }
    }

    fn fail_service(&self, id: &ServiceId, err: &DomainError) {
        error!(service = %id, error = %err, "Service failed to start");
        self.update(id, |s| {
            s.set_error(err.to_string());
            self.transition(s, id, ServiceStatus::Failed);
        });
    }

    async fn discard_process(&self, definition: &ServiceDefinition, handle: &ProcessHandle) {
        let id = definition.id();
        if let Err(e) = self
            .supervisor
            .terminate(handle, self.grace_period(definition))
            .await
        {
            warn!(service = %id, pid = handle.pid(), error = %e, "Could not terminate process");
        }
        self.update(id, |s| {
            if s.is_current_generation(handle.generation()) {
                s.detach_process();
            }
        });
    }

    fn startup_report(&self) -> StartupReport {
        let states = self.states_read();
        let mut report = StartupReport::default();
        for definitions in self.registry.definitions_by_priority() {
            for definition in definitions {
                let id = definition.id().to_string();
                let Some(state) = states.get(definition.id()) else {
                    continue;
                };
                match state.status() {
                    ServiceStatus::Running => report.running.push(id),
                    ServiceStatus::NotStarted => report.not_started.push(id),
                    ServiceStatus::Failed => report.failed.push(FailedService {
                        id,
                        error: state.last_error().map(str::to_string),
                    }),
                    _ => {}
                }
            }
        }
        report
    }

    // ===== Monitoring =====

    fn begin_monitoring(self: &Arc<Self>) {
        let running: Vec<(u64, Option<u32>, &ServiceDefinition)> = {
            let states = self.states_read();
            self.registry
                .definitions()
                .filter_map(|definition| {
                    let state = states.get(definition.id())?;
                    if state.status() != ServiceStatus::Running {
                        return None;
                    }
                    Some((state.generation()?, state.pid(), definition))
                })
                .collect()
        };

        let monitored = running
            .into_iter()
            .filter(|(generation, pid, definition)| {
                self.monitor.start_monitoring(definition, *generation, *pid)
            })
            .count();
        info!(monitored = monitored, "Monitoring running services");
    }

    fn spawn_event_loop(self: &Arc<Self>) {
        if let Some(receiver) = lock(&self.receiver).take() {
            lock(&self.tasks).spawn(Self::run_event_loop(self.clone(), receiver));
        }
    }

    async fn run_event_loop(self: Arc<Self>, mut receiver: EventReceiver) {
        debug!("Supervision event loop started");
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                event = receiver.recv() => match event {
                    Some(event) => self.handle_event(event),
                    None => break,
                },
            }
        }
        debug!("Supervision event loop stopped");
    }

    fn handle_event(self: &Arc<Self>, event: SupervisionEvent) {
        match event {
            SupervisionEvent::HealthChecked(check) => self.on_health_check(check),
            SupervisionEvent::Failure(failure) => self.on_failure(failure),
        }
    }

    fn on_health_check(self: &Arc<Self>, check: HealthCheckEvent) {
        self.health_stats.record(check.healthy);

        let current = self
            .update(&check.service_id, |s| {
                if !s.is_current_generation(check.generation) {
                    return false;
                }
                s.record_health_check(check.healthy, check.detail.clone(), check.at);
                true
            })
            .unwrap_or(false);
        if !current {
            debug!(service = %check.service_id, generation = check.generation, "Dropping stale health result");
            return;
        }

        if !check.healthy {
            self.on_failure(FailureEvent {
                service_id: check.service_id,
                generation: check.generation,
                kind: FailureKind::HealthCheckFailed,
                detail: check
                    .detail
                    .unwrap_or_else(|| "health check failed".to_string()),
            });
        }
    }

    fn on_failure(self: &Arc<Self>, event: FailureEvent) {
        let id = event.service_id.clone();
        if event.kind == FailureKind::CooldownElapsed {
            lock(&self.cooling_down).remove(&id);
        }
        if lock(&self.restarting).contains(&id) {
            debug!(service = %id, kind = ?event.kind, "Restart in progress, ignoring failure");
            return;
        }

        let now = Instant::now();
        let (action, restart_count) = {
            let mut states = self.states_write();
            let Some(state) = states.get_mut(&id) else {
                return;
            };
            if !state.is_current_generation(event.generation) {
                debug!(service = %id, generation = event.generation, "Dropping stale failure");
                return;
            }
            match state.status() {
                ServiceStatus::Running => {
                    self.transition(state, &id, ServiceStatus::Unhealthy);
                }
                ServiceStatus::Unhealthy => {}
                status => {
                    debug!(service = %id, status = %status, "Ignoring failure of inactive service");
                    return;
                }
            }
            if matches!(event.kind, FailureKind::ProcessExited { .. }) {
                state.detach_process();
            }
            if event.kind != FailureKind::CooldownElapsed {
                state.set_error(event.detail.clone());
            }

            let action = self.policy.on_failure(state, now);
            match action {
                RecoveryAction::Restart => {
                    state.record_restart(now);
                    lock(&self.restarting).insert(id.clone());
                }
                RecoveryAction::GiveUp => {
                    self.transition(state, &id, ServiceStatus::Failed);
                }
                RecoveryAction::Cooldown { .. } => {}
            }
            (action, state.restart_count())
        };

        if matches!(event.kind, FailureKind::ProcessExited { .. }) {
            self.monitor.stop_monitoring(&id);
        }

        match action {
            RecoveryAction::Restart => {
                info!(
                    service = %id,
                    restart_count = restart_count,
                    reason = %event.detail,
                    "Restarting service"
                );
                lock(&self.tasks).spawn(Self::restart(self.clone(), id));
            }
            RecoveryAction::Cooldown { retry_at } => {
                if lock(&self.cooling_down).insert(id.clone()) {
                    info!(
                        service = %id,
                        restart_count = restart_count,
                        retry_in_ms = retry_at.saturating_duration_since(now).as_millis() as u64,
                        "Restart suppressed by cooldown"
                    );
                    self.schedule_reevaluation(id, event.generation, retry_at);
                }
            }
            RecoveryAction::GiveUp => {
                error!(
                    service = %id,
                    restart_count = restart_count,
                    "Restart limit reached, service marked failed"
                );
                self.monitor.stop_monitoring(&id);
                if let Some(handle) = self.supervisor.handle(&id) {
                    let inner = self.clone();
                    lock(&self.tasks).spawn(async move {
                        if let Ok(definition) = inner.registry.lookup(id.as_str()) {
                            inner.discard_process(definition, &handle).await;
                        }
                    });
                }
            }
        }
    }

    fn schedule_reevaluation(&self, id: ServiceId, generation: u64, at: Instant) {
        let token = self.shutdown.clone();
        let events = self.events.clone();
        lock(&self.tasks).spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep_until(at) => {
                    let _ = events.send(SupervisionEvent::Failure(FailureEvent {
                        service_id: id,
                        generation,
                        kind: FailureKind::CooldownElapsed,
                        detail: "restart cooldown elapsed".to_string(),
                    }));
                }
            }
        });
    }

    // ===== Recovery =====

    async fn restart(self: Arc<Self>, id: ServiceId) {
        let outcome = self.try_restart(&id).await;
        lock(&self.restarting).remove(&id);

        match outcome {
            Ok(()) => {}
            Err(DomainError::Cancelled | DomainError::ShuttingDown) => {
                debug!(service = %id, "Restart abandoned, shutting down");
            }
            Err(e) => {
                warn!(service = %id, error = %e, "Restart failed");
                let generation = self
                    .states_read()
                    .get(&id)
                    .and_then(ServiceState::generation)
                    .unwrap_or_default();
                let _ = self.events.send(SupervisionEvent::Failure(FailureEvent {
                    service_id: id,
                    generation,
                    kind: FailureKind::RestartFailed,
                    detail: e.to_string(),
                }));
            }
        }
    }

    async fn try_restart(&self, id: &ServiceId) -> Result<(), DomainError> {
        let definition = self.registry.lookup(id.as_str())?;
        self.monitor.stop_monitoring(id);

        if let Some(old) = self.supervisor.handle(id) {
            match self
                .supervisor
                .terminate(&old, self.grace_period(definition))
                .await
            {
                Ok(outcome) => debug!(service = %id, pid = old.pid(), outcome = ?outcome, "Old process terminated"),
                Err(e) => warn!(service = %id, pid = old.pid(), error = %e, "Old process still alive"),
            }
        }
        self.update(id, |s| s.detach_process());

        let handle = self.supervisor.spawn(definition).await?;
        self.update(id, |s| {
            s.attach_process(handle.pid(), handle.generation(), Instant::now())
        });

        if let Err(e) = self
            .prober
            .wait_until_ready(
                definition,
                &handle,
                self.readiness_policy(definition),
                &self.shutdown,
            )
            .await
        {
            self.discard_process(definition, &handle).await;
            return Err(e);
        }

        let recovered = self
            .update(id, |s| {
                s.status() == ServiceStatus::Unhealthy
                    && self.transition(s, id, ServiceStatus::Running)
            })
            .unwrap_or(false);
        if recovered {
            info!(service = %id, pid = handle.pid(), generation = handle.generation(), "Service recovered");
            // Before the monitoring phase, begin_monitoring picks it up
            if self.phase_is(OrchestratorPhase::Monitoring) {
                self.monitor
                    .start_monitoring(definition, handle.generation(), Some(handle.pid()));
            }
        }
        Ok(())
    }

    // ===== Shutdown =====

    async fn drain_tasks(&self) {
        loop {
            let mut tasks = std::mem::take(&mut *lock(&self.tasks));
            if tasks.is_empty() {
                break;
            }
            while let Some(result) = tasks.join_next().await {
                if let Err(e) = result {
                    warn!(error = %e, "Background task ended abnormally");
                }
            }
        }
    }

    fn settle_after_stop(&self, failures: &HashMap<ServiceId, String>) {
        let mut states = self.states_write();
        for (id, state) in states.iter_mut() {
            match state.status() {
                ServiceStatus::Running => {
                    self.transition(state, id, ServiceStatus::Stopped);
                }
                ServiceStatus::Unhealthy => {
                    if state.last_error().is_none() {
                        state.set_error("terminated while unhealthy");
                    }
                    self.transition(state, id, ServiceStatus::Failed);
                }
                ServiceStatus::Starting => {
                    state.set_error("startup interrupted by shutdown");
                    self.transition(state, id, ServiceStatus::Failed);
                }
                _ => {}
            }
            if let Some(reason) = failures.get(id) {
                state.set_error(reason.clone());
            } else {
                state.detach_process();
            }
        }
    }

    // ===== Reporting =====

    fn report(&self) -> StatusReport {
        let now = Instant::now();
        let states = self.states_read();
        let mut totals = StatusTotals {
            health_checks: self.health_stats.totals(),
            ..Default::default()
        };

        let mut services = Vec::with_capacity(self.registry.len());
        for definitions in self.registry.definitions_by_priority() {
            for definition in definitions {
                if let Some(state) = states.get(definition.id()) {
                    totals.count(state.status());
                    services.push(status_entry(definition, state, now));
                }
            }
        }

        StatusReport {
            phase: lock(&self.phase).to_string(),
            services,
            totals,
        }
    }
}

fn status_entry(
    definition: &ServiceDefinition,
    state: &ServiceState,
    now: Instant,
) -> ServiceStatusEntry {
    ServiceStatusEntry {
        id: definition.id().to_string(),
        display_name: definition.display_name().to_string(),
        status: state.status(),
        priority: definition.priority(),
        port: definition.port(),
        secondary_port: definition.secondary_port(),
        pid: state.pid(),
        uptime_secs: state
            .started_at()
            .filter(|_| state.status().has_process())
            .map(|at| now.saturating_duration_since(at).as_secs()),
        restart_count: state.restart_count(),
        health_check: definition.health_check().kind().to_string(),
        last_health_check: state.last_health_check().map(|outcome| LastHealthCheck {
            healthy: outcome.healthy,
            seconds_ago: state
                .last_health_check_at()
                .map(|at| now.saturating_duration_since(at).as_secs())
                .unwrap_or_default(),
            detail: outcome.detail.clone(),
        }),
        last_error: state.last_error().map(str::to_string),
    }
}
