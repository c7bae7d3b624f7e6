//! Task handler contract.

use async_trait::async_trait;

use authkeep_core::error::{AppError, ErrorKind};

/// Processes tasks of type `T` taken off a [`TaskQueue`](crate::queue::TaskQueue).
#[async_trait]
pub trait TaskHandler<T>: Send + Sync + std::fmt::Debug {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Execute one attempt of the task.
    async fn execute(&self, task: &T) -> Result<(), TaskError>;
}

/// Error from a task attempt
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// Permanent failure, do not retry
    #[error("Permanent task failure: {0}")]
    Permanent(String),

    /// Transient failure, may be retried
    #[error("Transient task failure: {0}")]
    Transient(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] AppError),
}

impl TaskError {
    /// Whether another attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transient(_) => true,
            Self::Permanent(_) => false,
            Self::Internal(e) => e.is(ErrorKind::Timeout) || e.is(ErrorKind::ServiceUnavailable),
        }
    }
}
