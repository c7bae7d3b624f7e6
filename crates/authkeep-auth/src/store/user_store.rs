//! User persistence contract.

use async_trait::async_trait;

use authkeep_core::context::RequestContext;
use authkeep_core::result::AppResult;
use authkeep_core::types::UserId;
use authkeep_entity::user::User;

/// Persistence for user records. Emails are stored in normalized form.
#[async_trait]
pub trait UserStore: Send + Sync + std::fmt::Debug {
    /// Insert a new user. Fails with a `Conflict` error if the email is taken.
    async fn create(&self, ctx: &RequestContext, user: &User) -> AppResult<()>;

    /// Fetch a user by id.
    async fn get_by_id(&self, ctx: &RequestContext, id: UserId) -> AppResult<Option<User>>;

    /// Fetch a user by normalized email.
    async fn get_by_email(&self, ctx: &RequestContext, email: &str) -> AppResult<Option<User>>;

    /// Replace an existing user. Fails with `NotFound` if absent.
    async fn update(&self, ctx: &RequestContext, user: &User) -> AppResult<()>;

    /// Delete a user. Returns whether a record was removed.
    async fn delete(&self, ctx: &RequestContext, id: UserId) -> AppResult<bool>;

    /// Whether an account with this normalized email exists.
    async fn exists_by_email(&self, ctx: &RequestContext, email: &str) -> AppResult<bool>;
}
