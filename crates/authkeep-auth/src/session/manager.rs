//! Session lifecycle manager: signup, login, refresh rotation, logout, and
//! email verification flows.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use authkeep_core::config::SessionConfig;
use authkeep_core::context::RequestContext;
use authkeep_core::error::ErrorKind;
use authkeep_core::types::UserId;
use authkeep_entity::session::{RefreshToken, TokenState};
use authkeep_entity::user::User;

use crate::error::{AuthError, AuthResult};
use crate::jwt::{Claims, TokenSigner};
use crate::password::{CredentialPolicy, PasswordVerifier};
use crate::store::{RefreshTokenStore, UserStore};
use crate::token::SecureTokenGenerator;

use super::types::{
    AuthTokens, LoginInput, LogoutInput, RefreshInput, ResendVerificationOutput, SignupInput,
    SignupOutput, VerifyEmailInput,
};

/// Password hashed once and compared against on unknown-email logins, so
/// that both failure paths cost one hash comparison.
const DECOY_PASSWORD: &str = "authkeep-decoy-password";

/// Orchestrates the authentication lifecycle.
///
/// Holds no per-request state: every mutable resource lives behind the
/// store contracts, so one instance can serve any number of concurrent
/// callers.
#[derive(Clone)]
pub struct SessionManager {
    /// Access-token signer.
    signer: Arc<TokenSigner>,
    /// User persistence.
    users: Arc<dyn UserStore>,
    /// Refresh-token persistence.
    tokens: Arc<dyn RefreshTokenStore>,
    /// Password hashing.
    passwords: Arc<dyn PasswordVerifier>,
    /// Opaque token source.
    generator: Arc<dyn SecureTokenGenerator>,
    /// Email and password rules.
    policy: CredentialPolicy,
    /// TTLs and token sizes.
    config: SessionConfig,
    /// Lazily computed hash of [`DECOY_PASSWORD`].
    decoy_hash: Arc<OnceCell<String>>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("signer", &self.signer)
            .field("policy", &self.policy)
            .field("config", &self.config)
            .finish()
    }
}

impl SessionManager {
    /// Creates a new session manager with all required collaborators.
    pub fn new(
        signer: Arc<TokenSigner>,
        users: Arc<dyn UserStore>,
        tokens: Arc<dyn RefreshTokenStore>,
        passwords: Arc<dyn PasswordVerifier>,
        generator: Arc<dyn SecureTokenGenerator>,
        config: SessionConfig,
    ) -> Self {
        Self {
            signer,
            users,
            tokens,
            passwords,
            generator,
            policy: CredentialPolicy::from_config(&config),
            config,
            decoy_hash: Arc::new(OnceCell::new()),
        }
    }

    /// The signer used for access tokens.
    pub fn signer(&self) -> &TokenSigner {
        &self.signer
    }

    /// Registers a new, unverified user.
    ///
    /// 1. Normalize and validate the email, validate the password
    /// 2. Reject an email that is already registered
    /// 3. Hash the password
    /// 4. Generate a verification token with its TTL
    /// 5. Persist the user
    pub async fn signup(&self, ctx: &RequestContext, input: SignupInput) -> AuthResult<SignupOutput> {
        let email = CredentialPolicy::normalize_email(&input.email);
        self.policy.validate_email(&email)?;
        self.policy.validate_password(&input.password)?;

        if self.users.exists_by_email(ctx, &email).await? {
            return Err(AuthError::DuplicateEmail);
        }

        let now = Utc::now();
        let expires_at = expiry(now, self.config.verification_token_ttl_seconds)?;

        let password_hash = self.passwords.hash(ctx, &input.password).await?;
        let verification_token = self.generator.generate(self.config.token_bytes)?;

        let mut user = User::new(email, password_hash, now);
        user.set_email_verification_token(verification_token.clone(), expires_at, now);

        // A concurrent signup for the same email can slip past the existence check.
        self.users.create(ctx, &user).await.map_err(|e| {
            if e.is(ErrorKind::Conflict) {
                AuthError::DuplicateEmail
            } else {
                AuthError::Collaborator(e)
            }
        })?;

        info!(
            request_id = %ctx.request_id(),
            user_id = %user.id,
            "User signed up"
        );

        Ok(SignupOutput {
            user_id: user.id,
            email: user.email,
            verification_token,
            verification_expires_at: expires_at,
        })
    }

    /// Authenticates by email and password and starts a new session.
    ///
    /// An unknown email and a wrong password both fail with
    /// [`AuthError::InvalidCredentials`] after one hash comparison.
    pub async fn login(&self, ctx: &RequestContext, input: LoginInput) -> AuthResult<AuthTokens> {
        let email = CredentialPolicy::normalize_email(&input.email);

        let user = match self.users.get_by_email(ctx, &email).await? {
            Some(user) => user,
            None => {
                self.burn_comparison(ctx, &input.password).await;
                warn!(request_id = %ctx.request_id(), "Login failed");
                return Err(AuthError::InvalidCredentials);
            }
        };

        let matches = self
            .passwords
            .compare(ctx, &input.password, &user.password_hash)
            .await?;
        if !matches {
            warn!(request_id = %ctx.request_id(), "Login failed");
            return Err(AuthError::InvalidCredentials);
        }

        let tokens = self.start_session(ctx, &user).await?;

        info!(
            request_id = %ctx.request_id(),
            user_id = %user.id,
            "User logged in"
        );

        Ok(tokens)
    }

    /// Exchanges a refresh token for a new access and refresh token.
    ///
    /// The presented token is retired through the store's atomic rotation, so
    /// it can be exchanged at most once even under concurrent submission.
    /// Unknown, revoked, rotated and expired tokens all fail with
    /// [`AuthError::InvalidToken`].
    pub async fn refresh(&self, ctx: &RequestContext, input: RefreshInput) -> AuthResult<AuthTokens> {
        let now = Utc::now();

        let current = self
            .tokens
            .get_by_token(ctx, &input.refresh_token)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        match current.state_at(now) {
            TokenState::Active => {}
            TokenState::Rotated => {
                warn!(
                    request_id = %ctx.request_id(),
                    user_id = %current.user_id,
                    "Rotated refresh token presented again"
                );
                return Err(AuthError::InvalidToken);
            }
            TokenState::Revoked | TokenState::Expired => return Err(AuthError::InvalidToken),
        }

        let user = self
            .users
            .get_by_id(ctx, current.user_id)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        let access_token = self
            .signer
            .issue(user.id, &user.email, user.email_verified)?;
        let replacement = RefreshToken::issue_until(
            self.generator.generate(self.config.token_bytes)?,
            user.id,
            expiry(now, self.config.refresh_token_ttl_seconds)?,
            ctx.client(),
            now,
        );

        let rotated = self
            .tokens
            .rotate(ctx, &current.token, &replacement, now)
            .await?;
        if rotated.is_none() {
            warn!(
                request_id = %ctx.request_id(),
                user_id = %user.id,
                "Refresh token was rotated by a concurrent request"
            );
            return Err(AuthError::InvalidToken);
        }

        info!(
            request_id = %ctx.request_id(),
            user_id = %user.id,
            "Refresh token rotated"
        );

        Ok(self.tokens_for(access_token, replacement))
    }

    /// Revokes a refresh token. Unknown or already revoked tokens are not an error.
    pub async fn logout(&self, ctx: &RequestContext, input: LogoutInput) -> AuthResult<()> {
        let revoked = self
            .tokens
            .revoke(ctx, &input.refresh_token, Utc::now())
            .await?;

        if revoked {
            info!(request_id = %ctx.request_id(), "Refresh token revoked");
        } else {
            debug!(request_id = %ctx.request_id(), "Logout with inactive refresh token");
        }

        Ok(())
    }

    /// Revokes every active refresh token of a user. Returns how many were revoked.
    pub async fn logout_all(&self, ctx: &RequestContext, user_id: UserId) -> AuthResult<u64> {
        let revoked = self
            .tokens
            .revoke_all_for_user(ctx, user_id, Utc::now())
            .await?;

        info!(
            request_id = %ctx.request_id(),
            user_id = %user_id,
            revoked,
            "All sessions revoked"
        );

        Ok(revoked)
    }

    /// Marks an email verified if `token` matches the outstanding verification token.
    ///
    /// Succeeds without changes if the email is already verified.
    pub async fn verify_email(&self, ctx: &RequestContext, input: VerifyEmailInput) -> AuthResult<()> {
        let email = CredentialPolicy::normalize_email(&input.email);
        let mut user = self
            .users
            .get_by_email(ctx, &email)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        if user.email_verified {
            return Ok(());
        }

        let now = Utc::now();
        if !user.is_email_verification_token_valid(&input.token, now) {
            return Err(AuthError::InvalidToken);
        }

        user.mark_email_verified(now);
        self.users.update(ctx, &user).await?;

        info!(
            request_id = %ctx.request_id(),
            user_id = %user.id,
            "Email verified"
        );

        Ok(())
    }

    /// Issues a fresh verification token, invalidating the previous one.
    pub async fn resend_verification_email(
        &self,
        ctx: &RequestContext,
        email: &str,
    ) -> AuthResult<ResendVerificationOutput> {
        let email = CredentialPolicy::normalize_email(email);
        let mut user = self
            .users
            .get_by_email(ctx, &email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if user.email_verified {
            return Err(AuthError::AlreadyVerified);
        }

        let verification_token = self.generator.generate(self.config.token_bytes)?;
        let now = Utc::now();
        let expires_at = expiry(now, self.config.verification_token_ttl_seconds)?;
        user.set_email_verification_token(verification_token.clone(), expires_at, now);
        self.users.update(ctx, &user).await?;

        info!(
            request_id = %ctx.request_id(),
            user_id = %user.id,
            "Verification token reissued"
        );

        Ok(ResendVerificationOutput {
            user_id: user.id,
            email: user.email,
            verification_token,
            verification_expires_at: expires_at,
        })
    }

    /// Fetches a user by id.
    pub async fn get_user_by_id(&self, ctx: &RequestContext, user_id: UserId) -> AuthResult<User> {
        self.users
            .get_by_id(ctx, user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// Active refresh tokens of a user, oldest first.
    pub async fn active_sessions(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
    ) -> AuthResult<Vec<RefreshToken>> {
        let now = Utc::now();
        let mut tokens = self.tokens.get_by_user(ctx, user_id).await?;
        tokens.retain(|t| t.is_valid_at(now));
        Ok(tokens)
    }

    /// Validates an access token. No store lookup is involved.
    pub fn validate_access_token(&self, token: &str) -> AuthResult<Claims> {
        self.signer.validate(token)
    }

    async fn start_session(&self, ctx: &RequestContext, user: &User) -> AuthResult<AuthTokens> {
        let access_token = self
            .signer
            .issue(user.id, &user.email, user.email_verified)?;
        let now = Utc::now();
        let refresh = RefreshToken::issue_until(
            self.generator.generate(self.config.token_bytes)?,
            user.id,
            expiry(now, self.config.refresh_token_ttl_seconds)?,
            ctx.client(),
            now,
        );
        self.tokens.create(ctx, &refresh).await?;
        Ok(self.tokens_for(access_token, refresh))
    }

    /// `expires_in` reports the refresh token's lifetime, the span within
    /// which the client can keep the session alive without logging in again.
    fn tokens_for(&self, access_token: String, refresh: RefreshToken) -> AuthTokens {
        AuthTokens {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: (refresh.expires_at - refresh.created_at).num_seconds(),
            refresh_expires_at: refresh.expires_at,
            user_id: refresh.user_id,
            refresh_token: refresh.token,
        }
    }

    async fn burn_comparison(&self, ctx: &RequestContext, password: &str) {
        let decoy = self
            .decoy_hash
            .get_or_try_init(|| self.passwords.hash(ctx, DECOY_PASSWORD))
            .await;
        if let Ok(hash) = decoy {
            let _ = self.passwords.compare(ctx, password, hash).await;
        }
    }
}

/// `now + ttl_seconds`, or a configuration error if that is not representable.
fn expiry(now: DateTime<Utc>, ttl_seconds: u64) -> AuthResult<DateTime<Utc>> {
    i64::try_from(ttl_seconds)
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or_else(|| {
            AuthError::Configuration(format!("TTL of {ttl_seconds}s is out of range"))
        })
}
