//! Periodic refresh-token cleanup.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};

use authkeep_auth::SessionCleanup;
use authkeep_core::config::SessionConfig;
use authkeep_core::context::RequestContext;

/// Runs [`SessionCleanup`] on a fixed interval until told to stop.
#[derive(Debug, Clone)]
pub struct CleanupScheduler {
    cleanup: SessionCleanup,
    interval: Duration,
}

impl CleanupScheduler {
    /// Create a scheduler running `cleanup` every `interval`.
    pub fn new(cleanup: SessionCleanup, interval: Duration) -> Self {
        Self { cleanup, interval }
    }

    /// Create a scheduler using `cleanup_interval_seconds`.
    pub fn from_config(cleanup: SessionCleanup, config: &SessionConfig) -> Self {
        Self::new(
            cleanup,
            Duration::from_secs(config.cleanup_interval_seconds.max(1)),
        )
    }

    /// Run until `cancel` becomes `true` or its sender is dropped.
    ///
    /// The first pass runs immediately. A failed pass is logged and the
    /// schedule continues. Returns the total number of tokens deleted.
    pub async fn run(&self, mut cancel: watch::Receiver<bool>) -> u64 {
        tracing::info!(
            "Cleanup scheduler started, interval={}s",
            self.interval.as_secs()
        );

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut total = 0u64;

        loop {
            tokio::select! {
                changed = cancel.changed() => {
                    if changed.is_err() || *cancel.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    let ctx = RequestContext::new().with_timeout(self.interval);
                    match self.cleanup.run_cleanup(&ctx).await {
                        Ok(deleted) => total += deleted,
                        Err(e) => tracing::error!("Refresh token cleanup failed: {}", e),
                    }
                }
            }
        }

        tracing::info!("Cleanup scheduler stopped, {} tokens removed", total);
        total
    }
}
