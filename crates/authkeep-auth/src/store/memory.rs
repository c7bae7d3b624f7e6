//! In-memory store implementations backed by `DashMap`.
//!
//! Suitable for single-node deployments, tests, and the CLI demo. Every
//! conditional transition happens under the shard lock of the affected
//! entry, which gives `revoke` and `rotate` their compare-and-set semantics.
//! `rotate` and `revoke_all_for_user` additionally hold a per-user lock, so a
//! bulk revocation never misses a replacement that is still being inserted.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::Mutex;

use authkeep_core::context::RequestContext;
use authkeep_core::error::AppError;
use authkeep_core::result::AppResult;
use authkeep_core::types::UserId;
use authkeep_entity::session::RefreshToken;
use authkeep_entity::user::User;

use super::refresh_token_store::RefreshTokenStore;
use super::user_store::UserStore;

/// In-memory user store with a unique email index.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserStore {
    /// Users by id.
    users: Arc<DashMap<UserId, User>>,
    /// Email to id index; enforces uniqueness.
    emails: Arc<DashMap<String, UserId>>,
}

impl InMemoryUserStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users.
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Returns true if no users are stored.
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn create(&self, ctx: &RequestContext, user: &User) -> AppResult<()> {
        ctx.check()?;

        match self.emails.entry(user.email.clone()) {
            Entry::Occupied(_) => Err(AppError::conflict(format!(
                "A user with email '{}' already exists",
                user.email
            ))),
            Entry::Vacant(slot) => {
                if self.users.contains_key(&user.id) {
                    return Err(AppError::conflict(format!("User {} already exists", user.id)));
                }
                self.users.insert(user.id, user.clone());
                slot.insert(user.id);
                Ok(())
            }
        }
    }

    async fn get_by_id(&self, ctx: &RequestContext, id: UserId) -> AppResult<Option<User>> {
        ctx.check()?;
        Ok(self.users.get(&id).map(|u| u.value().clone()))
    }

    async fn get_by_email(&self, ctx: &RequestContext, email: &str) -> AppResult<Option<User>> {
        ctx.check()?;
        let id = match self.emails.get(email) {
            Some(id) => *id,
            None => return Ok(None),
        };
        Ok(self.users.get(&id).map(|u| u.value().clone()))
    }

    async fn update(&self, ctx: &RequestContext, user: &User) -> AppResult<()> {
        ctx.check()?;

        let previous_email = match self.users.get(&user.id) {
            Some(existing) => existing.email.clone(),
            None => return Err(AppError::not_found(format!("User {} not found", user.id))),
        };

        if previous_email != user.email {
            match self.emails.entry(user.email.clone()) {
                Entry::Occupied(owner) if *owner.get() != user.id => {
                    return Err(AppError::conflict(format!(
                        "A user with email '{}' already exists",
                        user.email
                    )));
                }
                Entry::Occupied(_) => {}
                Entry::Vacant(slot) => {
                    slot.insert(user.id);
                }
            }
            self.emails.remove_if(&previous_email, |_, id| *id == user.id);
        }

        self.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn delete(&self, ctx: &RequestContext, id: UserId) -> AppResult<bool> {
        ctx.check()?;
        match self.users.remove(&id) {
            Some((_, user)) => {
                self.emails.remove_if(&user.email, |_, owner| *owner == id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn exists_by_email(&self, ctx: &RequestContext, email: &str) -> AppResult<bool> {
        ctx.check()?;
        Ok(self.emails.contains_key(email))
    }
}

/// In-memory refresh token store keyed by token value.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRefreshTokenStore {
    /// Tokens by value.
    tokens: Arc<DashMap<String, RefreshToken>>,
    /// Serializes rotation against bulk revocation per user.
    user_locks: Arc<DashMap<UserId, Arc<Mutex<()>>>>,
}

impl InMemoryRefreshTokenStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored tokens in any state.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Returns true if no tokens are stored.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    fn user_lock(&self, user_id: UserId) -> Arc<Mutex<()>> {
        Arc::clone(self.user_locks.entry(user_id).or_default().value())
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryRefreshTokenStore {
    async fn create(&self, ctx: &RequestContext, token: &RefreshToken) -> AppResult<()> {
        ctx.check()?;
        match self.tokens.entry(token.token.clone()) {
            Entry::Occupied(_) => Err(AppError::conflict("Refresh token already exists")),
            Entry::Vacant(slot) => {
                slot.insert(token.clone());
                Ok(())
            }
        }
    }

    async fn get_by_token(
        &self,
        ctx: &RequestContext,
        token: &str,
    ) -> AppResult<Option<RefreshToken>> {
        ctx.check()?;
        Ok(self.tokens.get(token).map(|t| t.value().clone()))
    }

    async fn get_by_user(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
    ) -> AppResult<Vec<RefreshToken>> {
        ctx.check()?;
        let mut tokens: Vec<RefreshToken> = self
            .tokens
            .iter()
            .filter(|t| t.user_id == user_id)
            .map(|t| t.value().clone())
            .collect();
        tokens.sort_by_key(|t| t.created_at);
        Ok(tokens)
    }

    async fn update(&self, ctx: &RequestContext, token: &RefreshToken) -> AppResult<()> {
        ctx.check()?;
        match self.tokens.get_mut(token.token.as_str()) {
            Some(mut existing) => {
                *existing = token.clone();
                Ok(())
            }
            None => Err(AppError::not_found("Refresh token not found")),
        }
    }

    async fn revoke(
        &self,
        ctx: &RequestContext,
        token: &str,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        ctx.check()?;
        Ok(self
            .tokens
            .get_mut(token)
            .map(|mut t| t.revoke(now))
            .unwrap_or(false))
    }

    async fn revoke_all_for_user(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> AppResult<u64> {
        ctx.check()?;
        let lock = self.user_lock(user_id);
        let _serialized = lock.lock().await;

        let mut revoked = 0u64;
        for mut entry in self.tokens.iter_mut() {
            if entry.user_id == user_id && entry.revoke(now) {
                revoked += 1;
            }
        }
        Ok(revoked)
    }

    async fn rotate(
        &self,
        ctx: &RequestContext,
        old: &str,
        replacement: &RefreshToken,
        now: DateTime<Utc>,
    ) -> AppResult<Option<RefreshToken>> {
        ctx.check()?;

        if replacement.token == old || self.tokens.contains_key(replacement.token.as_str()) {
            return Err(AppError::conflict("Replacement refresh token already exists"));
        }

        let Some(user_id) = self.tokens.get(old).map(|t| t.user_id) else {
            return Ok(None);
        };
        let lock = self.user_lock(user_id);
        let _serialized = lock.lock().await;

        // The shard guard must be released before inserting the replacement,
        // which may hash to the same shard.
        let retired = {
            let Some(mut current) = self.tokens.get_mut(old) else {
                return Ok(None);
            };
            if !current.rotate_to(replacement.token.clone(), now) {
                return Ok(None);
            }
            current.value().clone()
        };

        self.tokens.insert(replacement.token.clone(), replacement.clone());
        Ok(Some(retired))
    }

    async fn delete_expired(
        &self,
        ctx: &RequestContext,
        now: DateTime<Utc>,
        revoked_before: DateTime<Utc>,
    ) -> AppResult<u64> {
        ctx.check()?;
        let mut removed = 0u64;
        self.tokens.retain(|_, t| {
            let purge = t.is_purgeable(now, revoked_before);
            if purge {
                removed += 1;
            }
            !purge
        });
        Ok(removed)
    }

    async fn delete_by_token(&self, ctx: &RequestContext, token: &str) -> AppResult<bool> {
        ctx.check()?;
        Ok(self.tokens.remove(token).is_some())
    }
}
