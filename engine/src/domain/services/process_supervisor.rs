//! Process supervisor
//! Sole owner of the OS processes backing services: spawn, exit watching, termination
//!
//! Every spawn gets a new generation number. Exit notifications carry it so the
//! orchestrator can drop events about processes it has already replaced.

use crate::constants::shutdown::{SIGKILL, SIGTERM, UNOBSERVED_POLL_MS};
use crate::domain::events::{EventSender, FailureEvent, FailureKind, SupervisionEvent};
use crate::domain::ports::{ProcessExecutor, SpawnConfig};
use crate::domain::{DomainError, ServiceDefinition, ServiceId};
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Reference to one spawned process
#[derive(Debug, Clone)]
pub struct ProcessHandle {
    service_id: ServiceId,
    pid: u32,
    generation: u64,
    exit_rx: watch::Receiver<Option<i32>>,
    observable: bool,
}

impl ProcessHandle {
    pub fn service_id(&self) -> &ServiceId {
        &self.service_id
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether the exit of this process can be awaited
    pub fn is_observable(&self) -> bool {
        self.observable
    }

    /// Exit code, if the process is known to have exited
    pub fn exit_code(&self) -> Option<i32> {
        *self.exit_rx.borrow()
    }

    /// Resolve once the process exits. Never resolves for unobservable processes.
    pub async fn wait_exit(&self) -> i32 {
        let mut rx = self.exit_rx.clone();
        let code = match rx.wait_for(Option::is_some).await {
            Ok(code) => *code,
            Err(_) => None,
        };
        match code {
            Some(code) => code,
            None => std::future::pending().await,
        }
    }
}

/// How a termination request ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminateOutcome {
    /// Exited within the grace period after SIGTERM
    Graceful { exit_code: Option<i32> },
    /// Needed SIGKILL
    Forced { exit_code: Option<i32> },
    /// Was already gone
    AlreadyExited,
}

impl TerminateOutcome {
    pub fn is_clean(&self) -> bool {
        !matches!(self, TerminateOutcome::Forced { .. })
    }
}

enum Slot {
    Spawning,
    Live(ProcessHandle),
}

type Slots = Arc<Mutex<HashMap<ServiceId, Slot>>>;

fn lock(slots: &Slots) -> MutexGuard<'_, HashMap<ServiceId, Slot>> {
    slots.lock().unwrap_or_else(|e| e.into_inner())
}

pub struct ProcessSupervisor {
    executor: Arc<dyn ProcessExecutor>,
    events: EventSender,
    slots: Slots,
    generation: AtomicU64,
    closed: AtomicBool,
    kill_wait: Duration,
}

impl ProcessSupervisor {
    pub fn new(
        executor: Arc<dyn ProcessExecutor>,
        events: EventSender,
        kill_wait: Duration,
    ) -> Self {
        Self {
            executor,
            events,
            slots: Arc::new(Mutex::new(HashMap::new())),
            generation: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            kill_wait,
        }
    }

    /// Launch the service's command and start watching its exit.
    ///
    /// Fails with `AlreadyRunning` while a previous process of the same
    /// service is still registered, and with `ShuttingDown` after `close()`.
    pub async fn spawn(
        &self,
        definition: &ServiceDefinition,
    ) -> Result<ProcessHandle, DomainError> {
        let id = definition.id().clone();
        if self.closed.load(Ordering::SeqCst) {
            return Err(DomainError::ShuttingDown);
        }

        {
            let mut slots = lock(&self.slots);
            match slots.get(&id) {
                Some(Slot::Live(handle)) => {
                    return Err(DomainError::AlreadyRunning {
                        service: id.to_string(),
                        pid: handle.pid,
                    })
                }
                Some(Slot::Spawning) => {
                    return Err(DomainError::AlreadyRunning {
                        service: id.to_string(),
                        pid: 0,
                    })
                }
                None => {
                    slots.insert(id.clone(), Slot::Spawning);
                }
            }
        }

        let config = SpawnConfig::from_definition(definition);
        debug!(service = %id, command = %definition.command(), "Spawning process");
        let result = match self.executor.spawn(config).await {
            Ok(result) => result,
            Err(e) => {
                lock(&self.slots).remove(&id);
                error!(service = %id, error = %e, "Failed to spawn process");
                return Err(e);
            }
        };

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let (exit_tx, exit_rx) = watch::channel(None);
        let handle = ProcessHandle {
            service_id: id.clone(),
            pid: result.pid,
            generation,
            exit_rx,
            observable: result.exit_handle.is_some(),
        };
        lock(&self.slots).insert(id.clone(), Slot::Live(handle.clone()));

        info!(
            service = %id,
            pid = result.pid,
            generation = generation,
            "Process spawned"
        );

        if let Some(exit_handle) = result.exit_handle {
            let slots = self.slots.clone();
            let events = self.events.clone();
            let pid = result.pid;
            tokio::spawn(async move {
                let exit_code = match exit_handle.await {
                    Ok(code) => code,
                    Err(e) => {
                        warn!(
                            service = %id,
                            pid = pid,
                            error = %e,
                            "Error waiting for process exit, treating as failure"
                        );
                        -1
                    }
                };
                let _ = exit_tx.send(Some(exit_code));

                // Still registered means nobody asked it to stop
                let unexpected = {
                    let mut slots = lock(&slots);
                    let current = matches!(
                        slots.get(&id),
                        Some(Slot::Live(h)) if h.generation == generation
                    );
                    if current {
                        slots.remove(&id);
                    }
                    current
                };

                if unexpected {
                    warn!(
                        service = %id,
                        pid = pid,
                        exit_code = exit_code,
                        "Process exited unexpectedly"
                    );
                    let event = SupervisionEvent::Failure(FailureEvent {
                        service_id: id.clone(),
                        generation,
                        kind: FailureKind::ProcessExited { exit_code },
                        detail: format!("process {} exited with code {}", pid, exit_code),
                    });
                    if events.send(event).is_err() {
                        debug!(service = %id, "Event channel closed, exit not reported");
                    }
                } else {
                    debug!(service = %id, pid = pid, exit_code = exit_code, "Process exited");
                }
            });
        } else {
            debug!(service = %id, pid = result.pid, "Process exit cannot be observed");
        }

        Ok(handle)
    }

    /// Stop a process: SIGTERM, wait `grace`, SIGKILL, wait the kill timeout.
    ///
    /// The handle is deregistered first so the exit is not reported as a
    /// failure. If the process survives SIGKILL the handle is registered
    /// again and `TerminateFailed` is returned.
    pub async fn terminate(
        &self,
        handle: &ProcessHandle,
        grace: Duration,
    ) -> Result<TerminateOutcome, DomainError> {
        let id = handle.service_id();
        let pid = handle.pid();

        {
            let mut slots = lock(&self.slots);
            if matches!(slots.get(id), Some(Slot::Live(h)) if h.generation == handle.generation) {
                slots.remove(id);
            }
        }

        if handle.exit_code().is_some() {
            return Ok(TerminateOutcome::AlreadyExited);
        }

        if let Err(e) = self.executor.kill(pid, SIGTERM).await {
            if !self.executor.is_running(pid).await.unwrap_or(false) {
                debug!(service = %id, pid = pid, "Process already gone");
                return Ok(TerminateOutcome::AlreadyExited);
            }
            warn!(service = %id, pid = pid, error = %e, "Failed to send SIGTERM");
        }

        if self.wait_gone(handle, grace).await {
            info!(service = %id, pid = pid, "Process stopped gracefully");
            return Ok(TerminateOutcome::Graceful {
                exit_code: handle.exit_code(),
            });
        }

        warn!(
            service = %id,
            pid = pid,
            grace_secs = grace.as_secs_f64(),
            "Process did not stop in time, sending SIGKILL"
        );
        if let Err(e) = self.executor.kill(pid, SIGKILL).await {
            warn!(service = %id, pid = pid, error = %e, "Failed to send SIGKILL");
        }

        if self.wait_gone(handle, self.kill_wait).await {
            return Ok(TerminateOutcome::Forced {
                exit_code: handle.exit_code(),
            });
        }

        error!(service = %id, pid = pid, "Process survived SIGKILL");
        lock(&self.slots)
            .entry(id.clone())
            .or_insert_with(|| Slot::Live(handle.clone()));
        Err(DomainError::TerminateFailed {
            service: id.to_string(),
            pid,
        })
    }

    async fn wait_gone(&self, handle: &ProcessHandle, timeout: Duration) -> bool {
        if handle.is_observable() {
            return tokio::time::timeout(timeout, handle.wait_exit())
                .await
                .is_ok();
        }

        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if !self.executor.is_running(handle.pid()).await.unwrap_or(false) {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(UNOBSERVED_POLL_MS)).await;
        }
    }

    /// Terminate every registered process concurrently
    pub async fn terminate_all(
        &self,
        grace_for: impl Fn(&ServiceId) -> Duration,
    ) -> Vec<(ServiceId, Result<TerminateOutcome, DomainError>)> {
        let handles: Vec<ProcessHandle> = lock(&self.slots)
            .values()
            .filter_map(|slot| match slot {
                Slot::Live(h) => Some(h.clone()),
                Slot::Spawning => None,
            })
            .collect();

        join_all(handles.into_iter().map(|handle| {
            let grace = grace_for(handle.service_id());
            async move {
                let result = self.terminate(&handle, grace).await;
                (handle.service_id().clone(), result)
            }
        }))
        .await
    }

    /// Refuse further spawns
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// The registered process of `id`, if any
    pub fn handle(&self, id: &ServiceId) -> Option<ProcessHandle> {
        match lock(&self.slots).get(id) {
            Some(Slot::Live(h)) => Some(h.clone()),
            _ => None,
        }
    }

    pub fn live_count(&self) -> usize {
        lock(&self.slots)
            .values()
            .filter(|s| matches!(s, Slot::Live(_)))
            .count()
    }
}
