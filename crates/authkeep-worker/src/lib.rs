//! Background work for Authkeep.
//!
//! This crate provides:
//! - A bounded task queue drained by a fixed pool of workers, with per-task
//!   timeouts and retry with linear backoff
//! - A notification dispatcher that plugs the queue into the session manager
//! - A scheduler that periodically purges dead refresh tokens

pub mod executor;
pub mod notification;
pub mod queue;
pub mod scheduler;

pub use executor::{TaskError, TaskHandler};
pub use notification::{LogNotificationSender, NotificationDispatcher, NotificationSender};
pub use queue::{QueueStats, QueueStatsSnapshot, TaskQueue};
pub use scheduler::CleanupScheduler;
