//! Application-wide constants and default values
//!
//! Centralizes magic numbers and default configurations

/// Readiness probing during startup
pub mod readiness {
    /// Maximum number of readiness probes per start attempt
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 30;

    /// Delay between readiness probes (milliseconds)
    pub const DEFAULT_INTERVAL_MS: u64 = 1_000;
}

/// Post-startup health checks
pub mod health_check {
    /// Default interval between health checks (seconds)
    pub const DEFAULT_INTERVAL: u64 = 30;

    /// Default timeout for a single probe (seconds)
    pub const DEFAULT_TIMEOUT: u64 = 5;

    /// Consecutive failing probes before a service is declared unhealthy
    pub const DEFAULT_FAILURE_THRESHOLD: u32 = 1;

    /// Delay between probes of one tick when the threshold is above 1 (milliseconds)
    pub const DEFAULT_RETRY_INTERVAL_MS: u64 = 1_000;
}

/// Restart policy
pub mod recovery {
    /// Maximum restarts per service per orchestration run
    pub const DEFAULT_RESTART_CEILING: u32 = 3;

    /// Minimum delay between two restarts of one service (seconds)
    pub const DEFAULT_COOLDOWN: u64 = 60;
}

/// Process termination
pub mod shutdown {
    /// Time a process gets to exit after SIGTERM (seconds)
    pub const DEFAULT_GRACE_PERIOD: u64 = 10;

    /// Time a process gets to disappear after SIGKILL (seconds)
    pub const DEFAULT_KILL_WAIT: u64 = 5;

    /// Liveness poll interval for processes whose exit cannot be awaited (milliseconds)
    pub const UNOBSERVED_POLL_MS: u64 = 100;

    pub const SIGTERM: i32 = 15;
    pub const SIGKILL: i32 = 9;
}

/// Status endpoint
pub mod status {
    /// Default TCP address of the status endpoint
    pub const DEFAULT_ADDR: &str = "127.0.0.1:7070";
}
