//! Refresh token persistence contract.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use authkeep_core::context::RequestContext;
use authkeep_core::result::AppResult;
use authkeep_core::types::UserId;
use authkeep_entity::session::RefreshToken;

/// Persistence for refresh tokens.
#[async_trait]
pub trait RefreshTokenStore: Send + Sync + std::fmt::Debug {
    /// Insert a new token. Fails with a `Conflict` error if the value exists.
    async fn create(&self, ctx: &RequestContext, token: &RefreshToken) -> AppResult<()>;

    /// Fetch a token by its value.
    async fn get_by_token(&self, ctx: &RequestContext, token: &str)
    -> AppResult<Option<RefreshToken>>;

    /// All tokens belonging to a user, in any state.
    async fn get_by_user(&self, ctx: &RequestContext, user_id: UserId)
    -> AppResult<Vec<RefreshToken>>;

    /// Replace an existing token record. Fails with `NotFound` if absent.
    async fn update(&self, ctx: &RequestContext, token: &RefreshToken) -> AppResult<()>;

    /// Revoke a token if it exists and is not already revoked.
    ///
    /// Returns whether this call performed the transition.
    async fn revoke(&self, ctx: &RequestContext, token: &str, now: DateTime<Utc>)
    -> AppResult<bool>;

    /// Revoke every unrevoked token of a user. Returns how many were revoked.
    async fn revoke_all_for_user(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> AppResult<u64>;

    /// Atomically retire `old` in favour of `replacement`.
    ///
    /// Succeeds only if `old` exists and is valid at `now`; in that case `old`
    /// is marked revoked with `replaced_by` pointing at the replacement, the
    /// replacement is inserted, and the retired record is returned. Returns
    /// `Ok(None)` without side effects when `old` is unknown, revoked or
    /// expired. Of any number of concurrent calls for the same `old`, at most
    /// one returns `Some`.
    async fn rotate(
        &self,
        ctx: &RequestContext,
        old: &str,
        replacement: &RefreshToken,
        now: DateTime<Utc>,
    ) -> AppResult<Option<RefreshToken>>;

    /// Delete tokens expired at `now` or revoked before `revoked_before`.
    /// Returns how many were deleted.
    async fn delete_expired(
        &self,
        ctx: &RequestContext,
        now: DateTime<Utc>,
        revoked_before: DateTime<Utc>,
    ) -> AppResult<u64>;

    /// Delete one token. Returns whether a record was removed.
    async fn delete_by_token(&self, ctx: &RequestContext, token: &str) -> AppResult<bool>;
}
