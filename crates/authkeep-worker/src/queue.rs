//! Bounded task queue drained by a fixed pool of workers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use authkeep_core::config::WorkerConfig;
use authkeep_core::error::AppError;
use authkeep_core::result::AppResult;

use crate::executor::{TaskError, TaskHandler};

/// Counters describing what a queue has done since it started.
#[derive(Debug, Default)]
pub struct QueueStats {
    enqueued: AtomicU64,
    processed: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
    retried: AtomicU64,
}

/// Point-in-time copy of [`QueueStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueStatsSnapshot {
    /// Tasks accepted into the backlog.
    pub enqueued: u64,
    /// Tasks that eventually succeeded.
    pub processed: u64,
    /// Tasks abandoned after a permanent error or exhausted retries.
    pub failed: u64,
    /// Tasks rejected because the backlog was full.
    pub dropped: u64,
    /// Retry attempts scheduled.
    pub retried: u64,
}

impl QueueStats {
    /// Read every counter.
    pub fn snapshot(&self) -> QueueStatsSnapshot {
        QueueStatsSnapshot {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            processed: self.processed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            retried: self.retried.load(Ordering::Relaxed),
        }
    }

    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// A bounded backlog of tasks served by `workers` concurrent workers.
///
/// Enqueueing never waits: when the backlog is full the task is dropped and
/// the caller gets a `ServiceUnavailable` error. Must be started inside a
/// Tokio runtime.
pub struct TaskQueue<T> {
    /// Queue name for logs
    name: String,
    /// Producer side; `None` once shutdown has begun
    sender: Mutex<Option<mpsc::Sender<T>>>,
    /// Worker tasks; taken by shutdown
    workers: Mutex<Option<JoinSet<()>>>,
    /// Aborts retry sleeps and idle workers on forced shutdown
    cancel: CancellationToken,
    /// Counters
    stats: Arc<QueueStats>,
}

impl<T> std::fmt::Debug for TaskQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskQueue")
            .field("name", &self.name)
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}

impl<T: Send + Sync + 'static> TaskQueue<T> {
    /// Spawn the worker pool and return the queue handle.
    pub fn start(
        name: impl Into<String>,
        handler: Arc<dyn TaskHandler<T>>,
        config: &WorkerConfig,
    ) -> Self {
        let name = name.into();
        let workers = config.workers.max(1);
        let (sender, receiver) = mpsc::channel(config.queue_size.max(1));
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));
        let cancel = CancellationToken::new();
        let stats = Arc::new(QueueStats::default());

        let mut set = JoinSet::new();
        for worker_id in 0..workers {
            let worker = Worker {
                id: worker_id,
                queue: name.clone(),
                receiver: Arc::clone(&receiver),
                handler: Arc::clone(&handler),
                config: config.clone(),
                cancel: cancel.clone(),
                stats: Arc::clone(&stats),
            };
            set.spawn(worker.run());
        }

        tracing::info!(
            queue = %name,
            handler = handler.name(),
            workers,
            queue_size = config.queue_size,
            "Task queue started"
        );

        Self {
            name,
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(Some(set)),
            cancel,
            stats,
        }
    }

    /// Add a task to the backlog without waiting.
    pub fn try_enqueue(&self, task: T) -> AppResult<()> {
        let guard = lock(&self.sender);
        let Some(sender) = guard.as_ref() else {
            return Err(AppError::service_unavailable(format!(
                "Task queue '{}' is shut down",
                self.name
            )));
        };

        match sender.try_send(task) {
            Ok(()) => {
                QueueStats::bump(&self.stats.enqueued);
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                QueueStats::bump(&self.stats.dropped);
                tracing::warn!(queue = %self.name, "Task queue full, dropping task");
                Err(AppError::service_unavailable(format!(
                    "Task queue '{}' is full",
                    self.name
                )))
            }
            Err(TrySendError::Closed(_)) => Err(AppError::service_unavailable(format!(
                "Task queue '{}' is closed",
                self.name
            ))),
        }
    }

    /// Current counters.
    pub fn stats(&self) -> QueueStatsSnapshot {
        self.stats.snapshot()
    }

    /// Stop accepting tasks and wait up to `timeout` for the backlog to drain.
    ///
    /// Workers still busy after the timeout are cancelled and aborted.
    /// Returns `true` if the backlog drained in time. Calling it again is a no-op.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        drop(lock(&self.sender).take());
        let Some(mut set) = lock(&self.workers).take() else {
            return true;
        };

        tracing::info!(queue = %self.name, "Task queue draining");

        let drained = tokio::time::timeout(timeout, async {
            while set.join_next().await.is_some() {}
        })
        .await
        .is_ok();

        if !drained {
            tracing::warn!(
                queue = %self.name,
                timeout_ms = timeout.as_millis() as u64,
                "Task queue did not drain in time, aborting workers"
            );
            self.cancel.cancel();
            set.abort_all();
            while set.join_next().await.is_some() {}
        }

        tracing::info!(queue = %self.name, stats = ?self.stats.snapshot(), "Task queue stopped");
        drained
    }
}

impl<T> Drop for TaskQueue<T> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn lock<V>(mutex: &Mutex<V>) -> MutexGuard<'_, V> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct Worker<T> {
    id: usize,
    queue: String,
    receiver: Arc<tokio::sync::Mutex<mpsc::Receiver<T>>>,
    handler: Arc<dyn TaskHandler<T>>,
    config: WorkerConfig,
    cancel: CancellationToken,
    stats: Arc<QueueStats>,
}

impl<T: Send + Sync + 'static> Worker<T> {
    async fn run(self) {
        tracing::debug!(queue = %self.queue, worker = self.id, "Worker started");

        loop {
            let next = {
                let mut receiver = self.receiver.lock().await;
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => None,
                    task = receiver.recv() => task,
                }
            };

            let Some(task) = next else {
                break;
            };
            self.process(task).await;
        }

        tracing::debug!(queue = %self.queue, worker = self.id, "Worker stopped");
    }

    async fn process(&self, task: T) {
        let timeout = self.config.task_timeout();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            let outcome = match tokio::time::timeout(timeout, self.handler.execute(&task)).await {
                Ok(result) => result,
                Err(_) => Err(TaskError::Transient(format!(
                    "attempt timed out after {}ms",
                    timeout.as_millis()
                ))),
            };

            let err = match outcome {
                Ok(()) => {
                    QueueStats::bump(&self.stats.processed);
                    return;
                }
                Err(err) => err,
            };

            if !err.is_retryable() || attempt > self.config.max_retries {
                QueueStats::bump(&self.stats.failed);
                tracing::error!(
                    queue = %self.queue,
                    handler = self.handler.name(),
                    attempt,
                    error = %err,
                    "Task failed"
                );
                return;
            }

            QueueStats::bump(&self.stats.retried);
            let delay = self.config.retry_delay(attempt);
            tracing::warn!(
                queue = %self.queue,
                handler = self.handler.name(),
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Task attempt failed, retrying"
            );

            tokio::select! {
                _ = self.cancel.cancelled() => {
                    QueueStats::bump(&self.stats.failed);
                    return;
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
