//! Session manager decorator that emits out-of-band notifications.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use authkeep_core::config::NotificationConfig;
use authkeep_core::context::RequestContext;
use authkeep_core::result::AppResult;
use authkeep_core::types::{ClientMeta, UserId};
use authkeep_entity::session::RefreshToken;
use authkeep_entity::user::User;

use crate::error::AuthResult;
use crate::jwt::Claims;
use crate::password::CredentialPolicy;

use super::manager::SessionManager;
use super::types::{
    AuthTokens, LoginInput, LogoutInput, RefreshInput, ResendVerificationOutput, SignupInput,
    SignupOutput, VerifyEmailInput,
};

/// A message to deliver to a user outside the request path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// Carries a verification token to the address being verified.
    VerificationRequested {
        user_id: UserId,
        email: String,
        token: String,
        expires_at: DateTime<Utc>,
    },
    /// A new session was started for the account.
    LoginAlert {
        user_id: UserId,
        email: String,
        client: ClientMeta,
        at: DateTime<Utc>,
    },
}

impl Notification {
    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::VerificationRequested { .. } => "verification_requested",
            Self::LoginAlert { .. } => "login_alert",
        }
    }

    /// Address the notification is sent to.
    pub fn recipient(&self) -> &str {
        match self {
            Self::VerificationRequested { email, .. } | Self::LoginAlert { email, .. } => email,
        }
    }

    /// User the notification concerns.
    pub fn user_id(&self) -> UserId {
        match self {
            Self::VerificationRequested { user_id, .. } | Self::LoginAlert { user_id, .. } => {
                *user_id
            }
        }
    }
}

/// Accepts notifications for asynchronous delivery.
///
/// `enqueue` must not block on delivery. A full or closed sink returns an
/// error which callers log and drop.
pub trait NotificationSink: Send + Sync + std::fmt::Debug {
    /// Hand a notification off for delivery.
    fn enqueue(&self, notification: Notification) -> AppResult<()>;
}

/// Wraps a [`SessionManager`] and enqueues notifications after successful
/// signup, verification resend and (optionally) login.
///
/// The wrapped manager's result is returned unchanged; a notification that
/// cannot be enqueued never fails the operation.
#[derive(Debug, Clone)]
pub struct NotifyingSessionManager {
    inner: Arc<SessionManager>,
    sink: Arc<dyn NotificationSink>,
    config: NotificationConfig,
}

impl NotifyingSessionManager {
    /// Creates the decorator.
    pub fn new(
        inner: Arc<SessionManager>,
        sink: Arc<dyn NotificationSink>,
        config: NotificationConfig,
    ) -> Self {
        Self {
            inner,
            sink,
            config,
        }
    }

    /// The wrapped manager.
    pub fn inner(&self) -> &Arc<SessionManager> {
        &self.inner
    }

    /// [`SessionManager::signup`], then queues a verification email when enabled.
    pub async fn signup(&self, ctx: &RequestContext, input: SignupInput) -> AuthResult<SignupOutput> {
        let out = self.inner.signup(ctx, input).await?;
        if self.config.send_verification_emails {
            self.notify(
                ctx,
                Notification::VerificationRequested {
                    user_id: out.user_id,
                    email: out.email.clone(),
                    token: out.verification_token.clone(),
                    expires_at: out.verification_expires_at,
                },
            );
        }
        Ok(out)
    }

    /// [`SessionManager::login`], then queues a login alert when enabled.
    pub async fn login(&self, ctx: &RequestContext, input: LoginInput) -> AuthResult<AuthTokens> {
        let email = CredentialPolicy::normalize_email(&input.email);
        let tokens = self.inner.login(ctx, input).await?;
        if self.config.send_login_notifications {
            self.notify(
                ctx,
                Notification::LoginAlert {
                    user_id: tokens.user_id,
                    email,
                    client: ctx.client().clone(),
                    at: Utc::now(),
                },
            );
        }
        Ok(tokens)
    }

    /// [`SessionManager::refresh`]. Sends nothing.
    pub async fn refresh(&self, ctx: &RequestContext, input: RefreshInput) -> AuthResult<AuthTokens> {
        self.inner.refresh(ctx, input).await
    }

    /// [`SessionManager::logout`]. Sends nothing.
    pub async fn logout(&self, ctx: &RequestContext, input: LogoutInput) -> AuthResult<()> {
        self.inner.logout(ctx, input).await
    }

    /// [`SessionManager::logout_all`]. Sends nothing.
    pub async fn logout_all(&self, ctx: &RequestContext, user_id: UserId) -> AuthResult<u64> {
        self.inner.logout_all(ctx, user_id).await
    }

    /// [`SessionManager::verify_email`]. Sends nothing.
    pub async fn verify_email(&self, ctx: &RequestContext, input: VerifyEmailInput) -> AuthResult<()> {
        self.inner.verify_email(ctx, input).await
    }

    /// [`SessionManager::resend_verification_email`], then queues the new
    /// verification email when enabled.
    pub async fn resend_verification_email(
        &self,
        ctx: &RequestContext,
        email: &str,
    ) -> AuthResult<ResendVerificationOutput> {
        let out = self.inner.resend_verification_email(ctx, email).await?;
        if self.config.send_verification_emails {
            self.notify(
                ctx,
                Notification::VerificationRequested {
                    user_id: out.user_id,
                    email: out.email.clone(),
                    token: out.verification_token.clone(),
                    expires_at: out.verification_expires_at,
                },
            );
        }
        Ok(out)
    }

    /// [`SessionManager::get_user_by_id`].
    pub async fn get_user_by_id(&self, ctx: &RequestContext, user_id: UserId) -> AuthResult<User> {
        self.inner.get_user_by_id(ctx, user_id).await
    }

    /// [`SessionManager::active_sessions`].
    pub async fn active_sessions(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
    ) -> AuthResult<Vec<RefreshToken>> {
        self.inner.active_sessions(ctx, user_id).await
    }

    /// [`SessionManager::validate_access_token`].
    pub fn validate_access_token(&self, token: &str) -> AuthResult<Claims> {
        self.inner.validate_access_token(token)
    }

    fn notify(&self, ctx: &RequestContext, notification: Notification) {
        let kind = notification.kind();
        let user_id = notification.user_id();
        if let Err(e) = self.sink.enqueue(notification) {
            warn!(
                request_id = %ctx.request_id(),
                user_id = %user_id,
                kind,
                error = %e,
                "Failed to enqueue notification"
            );
        }
    }
}
