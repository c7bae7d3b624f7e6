//! Background worker pool configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Bounded background task queue configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Number of worker tasks draining the queue.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Maximum number of tasks waiting in the backlog.
    #[serde(default = "default_queue_size")]
    pub queue_size: usize,
    /// Retries after the first failed attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base delay between retries in milliseconds; multiplied by the attempt number.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
    /// Upper bound on a single attempt, in seconds.
    #[serde(default = "default_task_timeout")]
    pub task_timeout_seconds: u64,
    /// How long shutdown waits for the backlog to drain, in seconds.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_seconds: u64,
}

impl WorkerConfig {
    /// Delay before retry number `attempt` (1-based).
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.retry_delay_ms.saturating_mul(u64::from(attempt)))
    }

    /// Per-attempt timeout.
    pub fn task_timeout(&self) -> Duration {
        Duration::from_secs(self.task_timeout_seconds)
    }

    /// Shutdown drain timeout.
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_seconds)
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            queue_size: default_queue_size(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay(),
            task_timeout_seconds: default_task_timeout(),
            shutdown_timeout_seconds: default_shutdown_timeout(),
        }
    }
}

fn default_workers() -> usize {
    5
}

fn default_queue_size() -> usize {
    100
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    5000
}

fn default_task_timeout() -> u64 {
    30
}

fn default_shutdown_timeout() -> u64 {
    30
}
