//! Notification delivery through the bounded task queue.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use authkeep_auth::{Notification, NotificationSink};
use authkeep_core::config::WorkerConfig;
use authkeep_core::result::AppResult;

use crate::executor::{TaskError, TaskHandler};
use crate::queue::{QueueStatsSnapshot, TaskQueue};

/// Delivers a notification to its recipient (SMTP relay, webhook, ...).
#[async_trait]
pub trait NotificationSender: Send + Sync + std::fmt::Debug {
    /// Deliver one notification. Transient errors are retried by the queue.
    async fn send(&self, notification: &Notification) -> Result<(), TaskError>;
}

/// Sender that only records deliveries in the log. Tokens are not logged.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotificationSender;

#[async_trait]
impl NotificationSender for LogNotificationSender {
    async fn send(&self, notification: &Notification) -> Result<(), TaskError> {
        match notification {
            Notification::VerificationRequested {
                user_id,
                email,
                expires_at,
                ..
            } => {
                tracing::info!(
                    user_id = %user_id,
                    recipient = %email,
                    expires_at = %expires_at,
                    "Verification email sent"
                );
            }
            Notification::LoginAlert {
                user_id,
                email,
                client,
                at,
            } => {
                tracing::info!(
                    user_id = %user_id,
                    recipient = %email,
                    user_agent = client.user_agent.as_deref().unwrap_or("unknown"),
                    ip_address = ?client.ip_address,
                    at = %at,
                    "Login alert sent"
                );
            }
        }
        Ok(())
    }
}

/// Adapts a [`NotificationSender`] to the queue's handler contract.
#[derive(Debug)]
struct SendNotification {
    sender: Arc<dyn NotificationSender>,
}

#[async_trait]
impl TaskHandler<Notification> for SendNotification {
    fn name(&self) -> &str {
        "send_notification"
    }

    async fn execute(&self, task: &Notification) -> Result<(), TaskError> {
        self.sender.send(task).await
    }
}

/// [`NotificationSink`] backed by a bounded worker pool.
///
/// `enqueue` returns immediately; a full backlog is reported as
/// `ServiceUnavailable` and the notification is dropped.
#[derive(Debug)]
pub struct NotificationDispatcher {
    queue: TaskQueue<Notification>,
    shutdown_timeout: Duration,
}

impl NotificationDispatcher {
    /// Start the worker pool delivering through `sender`.
    pub fn start(sender: Arc<dyn NotificationSender>, config: &WorkerConfig) -> Self {
        let handler = Arc::new(SendNotification { sender });
        Self {
            queue: TaskQueue::<Notification>::start("notifications", handler, config),
            shutdown_timeout: config.shutdown_timeout(),
        }
    }

    /// Queue counters.
    pub fn stats(&self) -> QueueStatsSnapshot {
        self.queue.stats()
    }

    /// Drain the backlog within the configured shutdown timeout.
    pub async fn shutdown(&self) -> bool {
        self.queue.shutdown(self.shutdown_timeout).await
    }
}

impl NotificationSink for NotificationDispatcher {
    fn enqueue(&self, notification: Notification) -> AppResult<()> {
        let kind = notification.kind();
        self.queue.try_enqueue(notification)?;
        tracing::debug!(kind, "Notification queued");
        Ok(())
    }
}
