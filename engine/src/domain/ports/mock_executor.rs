//! In-memory port implementations for testing
//! Deterministic stand-ins for the process and health-check adapters

use super::{HealthCheckExecutor, ProcessExecutor, SpawnConfig, SpawnResult};
use crate::domain::{DomainError, HealthStatus, ServiceDefinition};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::oneshot;

const SIGTERM: i32 = 15;
const SIGKILL: i32 = 9;

struct MockProcess {
    service: String,
    exit_tx: Option<oneshot::Sender<i32>>,
}

impl MockProcess {
    fn alive(&self) -> bool {
        self.exit_tx.is_some()
    }

    fn exit(&mut self, code: i32) {
        if let Some(tx) = self.exit_tx.take() {
            let _ = tx.send(code);
        }
    }
}

#[derive(Default)]
struct MockState {
    next_pid: u32,
    processes: HashMap<u32, MockProcess>,
    spawn_log: Vec<(String, u32)>,
    signals: Vec<(u32, i32)>,
    failing: HashSet<String>,
    ignore_sigterm: HashSet<String>,
    unkillable: HashSet<String>,
    unobservable: HashSet<String>,
    exit_on_spawn: HashMap<String, i32>,
    max_alive: HashMap<String, usize>,
}

impl MockState {
    fn alive_count(&self, service: &str) -> usize {
        self.processes
            .values()
            .filter(|p| p.service == service && p.alive())
            .count()
    }
}

/// Fake process executor; processes live until killed or told to exit
#[derive(Clone)]
pub struct MockProcessExecutor {
    state: Arc<Mutex<MockState>>,
}

impl MockProcessExecutor {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                next_pid: 1000,
                ..Default::default()
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make every spawn of `service` fail as if the executable were missing
    pub fn fail_spawn(&self, service: &str) {
        self.lock().failing.insert(service.to_string());
    }

    /// Processes of `service` survive SIGTERM and only die on SIGKILL
    pub fn ignore_sigterm(&self, service: &str) {
        self.lock().ignore_sigterm.insert(service.to_string());
    }

    /// Processes of `service` survive every signal
    pub fn unkillable(&self, service: &str) {
        self.lock().unkillable.insert(service.to_string());
    }

    /// Spawns of `service` return no exit handle
    pub fn unobservable(&self, service: &str) {
        self.lock().unobservable.insert(service.to_string());
    }

    /// Processes of `service` exit with `code` right after being spawned
    pub fn exit_on_spawn(&self, service: &str, code: i32) {
        self.lock().exit_on_spawn.insert(service.to_string(), code);
    }

    /// Make the live process of `service` exit with `code`.
    /// Returns the pid that exited.
    pub fn exit(&self, service: &str, code: i32) -> Option<u32> {
        let mut state = self.lock();
        let (pid, process) = state
            .processes
            .iter_mut()
            .find(|(_, p)| p.service == service && p.alive())?;
        process.exit(code);
        Some(*pid)
    }

    pub fn spawn_count(&self, service: &str) -> usize {
        self.lock()
            .spawn_log
            .iter()
            .filter(|(s, _)| s == service)
            .count()
    }

    /// Services in spawn order
    pub fn spawn_order(&self) -> Vec<String> {
        self.lock().spawn_log.iter().map(|(s, _)| s.clone()).collect()
    }

    pub fn alive_count(&self, service: &str) -> usize {
        self.lock().alive_count(service)
    }

    pub fn total_alive(&self) -> usize {
        self.lock().processes.values().filter(|p| p.alive()).count()
    }

    /// Highest number of simultaneously live processes ever seen for `service`
    pub fn max_alive(&self, service: &str) -> usize {
        self.lock().max_alive.get(service).copied().unwrap_or(0)
    }

    pub fn signals_sent(&self) -> Vec<(u32, i32)> {
        self.lock().signals.clone()
    }
}

impl Default for MockProcessExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProcessExecutor for MockProcessExecutor {
    async fn spawn(&self, config: SpawnConfig) -> Result<SpawnResult, DomainError> {
        let mut state = self.lock();
        if state.failing.contains(&config.service) {
            return Err(DomainError::spawn_failed(
                &config.service,
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("{}: No such file or directory", config.command),
                ),
            ));
        }

        state.next_pid += 1;
        let pid = state.next_pid;
        let (tx, rx) = oneshot::channel();
        let mut process = MockProcess {
            service: config.service.clone(),
            exit_tx: Some(tx),
        };
        if let Some(code) = state.exit_on_spawn.get(&config.service).copied() {
            process.exit(code);
        }
        state.processes.insert(pid, process);
        state.spawn_log.push((config.service.clone(), pid));

        let alive = state.alive_count(&config.service);
        let max = state.max_alive.entry(config.service.clone()).or_insert(0);
        *max = (*max).max(alive);

        let exit_handle = if state.unobservable.contains(&config.service) {
            None
        } else {
            Some(Box::pin(async move {
                rx.await
                    .map_err(|_| DomainError::InvalidConfiguration("mock process lost".into()))
            }) as super::ProcessExitHandle)
        };

        Ok(SpawnResult { pid, exit_handle })
    }

    async fn kill(&self, pid: u32, signal: i32) -> Result<(), DomainError> {
        let mut state = self.lock();
        state.signals.push((pid, signal));

        let (ignore_term, unkillable) = match state.processes.get(&pid) {
            Some(p) => (
                state.ignore_sigterm.contains(&p.service),
                state.unkillable.contains(&p.service),
            ),
            None => {
                return Err(DomainError::SignalFailed {
                    pid,
                    signal,
                    reason: "No such process".to_string(),
                })
            }
        };

        if let Some(process) = state.processes.get_mut(&pid) {
            match signal {
                SIGTERM if !ignore_term && !unkillable => process.exit(128 + SIGTERM),
                SIGKILL if !unkillable => process.exit(128 + SIGKILL),
                _ => {}
            }
        }
        Ok(())
    }

    async fn is_running(&self, pid: u32) -> Result<bool, DomainError> {
        Ok(self
            .lock()
            .processes
            .get(&pid)
            .map(MockProcess::alive)
            .unwrap_or(false))
    }
}

/// Canned health-check answers, consumed per service in order.
/// Once a service's script runs out its fallback answer repeats.
#[derive(Clone, Default)]
pub struct ScriptedHealthCheckExecutor {
    inner: Arc<Mutex<ScriptState>>,
}

#[derive(Default)]
struct ScriptState {
    scripts: HashMap<String, VecDeque<Result<HealthStatus, DomainError>>>,
    fallback: HashMap<String, HealthStatus>,
    checks: HashMap<String, usize>,
}

impl ScriptedHealthCheckExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ScriptState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue answers for `service`
    pub fn push<I>(&self, service: &str, answers: I)
    where
        I: IntoIterator<Item = HealthStatus>,
    {
        self.lock()
            .scripts
            .entry(service.to_string())
            .or_default()
            .extend(answers.into_iter().map(Ok));
    }

    /// Queue a fail-fast abort for `service`
    pub fn push_abort(&self, service: &str, reason: &str) {
        self.lock()
            .scripts
            .entry(service.to_string())
            .or_default()
            .push_back(Err(DomainError::HealthCheckAborted(reason.to_string())));
    }

    /// Answer used once the script is exhausted (default: healthy)
    pub fn set_fallback(&self, service: &str, status: HealthStatus) {
        self.lock().fallback.insert(service.to_string(), status);
    }

    pub fn check_count(&self, service: &str) -> usize {
        self.lock().checks.get(service).copied().unwrap_or(0)
    }
}

#[async_trait]
impl HealthCheckExecutor for ScriptedHealthCheckExecutor {
    async fn check(
        &self,
        definition: &ServiceDefinition,
        _pid: Option<u32>,
    ) -> Result<HealthStatus, DomainError> {
        let service = definition.id().as_str();
        let mut state = self.lock();
        *state.checks.entry(service.to_string()).or_insert(0) += 1;

        if let Some(answer) = state.scripts.get_mut(service).and_then(VecDeque::pop_front) {
            return answer;
        }
        Ok(state
            .fallback
            .get(service)
            .copied()
            .unwrap_or(HealthStatus::Healthy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(service: &str) -> SpawnConfig {
        SpawnConfig {
            service: service.to_string(),
            command: "/bin/fake".to_string(),
            args: vec![],
            working_dir: None,
            env_vars: vec![],
        }
    }

    #[tokio::test]
    async fn test_spawn_and_exit() {
        let executor = MockProcessExecutor::new();
        let result = executor.spawn(config("db")).await.unwrap();
        assert!(executor.is_running(result.pid).await.unwrap());
        assert_eq!(executor.alive_count("db"), 1);

        assert_eq!(executor.exit("db", 3), Some(result.pid));
        assert_eq!(result.exit_handle.unwrap().await.unwrap(), 3);
        assert!(!executor.is_running(result.pid).await.unwrap());
    }

    #[tokio::test]
    async fn test_signals() {
        let executor = MockProcessExecutor::new();
        executor.ignore_sigterm("stubborn");
        let pid = executor.spawn(config("stubborn")).await.unwrap().pid;

        executor.kill(pid, SIGTERM).await.unwrap();
        assert!(executor.is_running(pid).await.unwrap());
        executor.kill(pid, SIGKILL).await.unwrap();
        assert!(!executor.is_running(pid).await.unwrap());
        assert_eq!(executor.signals_sent(), vec![(pid, SIGTERM), (pid, SIGKILL)]);

        assert!(executor.kill(99_999, SIGTERM).await.is_err());
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let executor = MockProcessExecutor::new();
        executor.fail_spawn("cache");
        let err = executor.spawn(config("cache")).await.unwrap_err();
        assert!(matches!(err, DomainError::SpawnFailed { .. }));
        assert_eq!(executor.spawn_count("cache"), 0);
    }

    #[tokio::test]
    async fn test_scripted_health_checks() {
        let health = ScriptedHealthCheckExecutor::new();
        let def = ServiceDefinition::builder("web", "/bin/web").build().unwrap();
        health.push("web", [HealthStatus::Unhealthy]);
        health.set_fallback("web", HealthStatus::Unhealthy);
        health.push_abort("web", "bad");

        assert_eq!(
            health.check(&def, None).await.unwrap(),
            HealthStatus::Unhealthy
        );
        assert!(health.check(&def, None).await.is_err());
        assert_eq!(
            health.check(&def, None).await.unwrap(),
            HealthStatus::Unhealthy
        );
        assert_eq!(health.check_count("web"), 3);
    }
}
