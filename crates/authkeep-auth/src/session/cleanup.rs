//! Purges expired and long-revoked refresh tokens.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::info;

use authkeep_core::config::SessionConfig;
use authkeep_core::context::RequestContext;
use authkeep_core::result::AppResult;

use crate::store::RefreshTokenStore;

/// Deletes refresh tokens that can no longer be used.
///
/// A token is removed once it has expired, or once it has been revoked for
/// longer than the retention window. Recently revoked tokens are kept so a
/// replayed rotated token can still be recognised.
#[derive(Debug, Clone)]
pub struct SessionCleanup {
    tokens: Arc<dyn RefreshTokenStore>,
    retention: Duration,
}

impl SessionCleanup {
    /// Creates a cleanup job retaining revoked tokens for `retention`.
    pub fn new(tokens: Arc<dyn RefreshTokenStore>, retention: Duration) -> Self {
        Self { tokens, retention }
    }

    /// Creates a cleanup job from the session configuration.
    pub fn from_config(tokens: Arc<dyn RefreshTokenStore>, config: &SessionConfig) -> Self {
        let days = i64::try_from(config.revoked_retention_days).unwrap_or(i64::MAX);
        let retention = Duration::try_days(days).unwrap_or(Duration::MAX);
        Self::new(tokens, retention)
    }

    /// Run one cleanup pass. Returns the number of deleted tokens.
    pub async fn run_cleanup(&self, ctx: &RequestContext) -> AppResult<u64> {
        let now = Utc::now();
        let revoked_before = now.checked_sub_signed(self.retention).unwrap_or(now);

        let deleted = self.tokens.delete_expired(ctx, now, revoked_before).await?;

        info!(
            request_id = %ctx.request_id(),
            deleted,
            "Refresh token cleanup complete"
        );

        Ok(deleted)
    }
}
