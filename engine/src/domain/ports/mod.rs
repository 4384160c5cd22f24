pub mod health_check_executor;
#[cfg(any(test, feature = "test-util"))]
pub mod mock_executor;
pub mod process_executor;

pub use health_check_executor::HealthCheckExecutor;
#[cfg(any(test, feature = "test-util"))]
pub use mock_executor::{MockProcessExecutor, ScriptedHealthCheckExecutor};
pub use process_executor::{
    ProcessExecutor, ProcessExitHandle, SpawnConfig, SpawnResult, PORT_ENV_VAR,
    SECONDARY_PORT_ENV_VAR,
};
