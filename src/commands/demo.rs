//! End-to-end lifecycle walkthrough against in-memory stores.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use authkeep_auth::session::{LoginInput, LogoutInput, RefreshInput, SignupInput, VerifyEmailInput};
use authkeep_auth::{
    Argon2PasswordVerifier, AuthError, InMemoryRefreshTokenStore, InMemoryUserStore,
    KeyMaterial, NotifyingSessionManager, RandomTokenGenerator, RefreshTokenStore,
    SecureTokenGenerator, SessionCleanup, SessionManager, TokenSigner,
};
use authkeep_core::config::AppConfig;
use authkeep_core::context::RequestContext;
use authkeep_core::types::ClientMeta;
use authkeep_worker::{LogNotificationSender, NotificationDispatcher};

use crate::output::{self, OutputFormat};

/// Arguments for the demo command
#[derive(Debug, Args)]
pub struct DemoArgs {
    /// Email to sign up with
    #[arg(long, default_value = "a@example.com")]
    pub email: String,

    /// Password to sign up with
    #[arg(long, default_value = "password123")]
    pub password: String,
}

/// One completed lifecycle step.
#[derive(Debug, Serialize, Tabled)]
struct Step {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Operation")]
    operation: &'static str,
    #[tabled(rename = "Outcome")]
    outcome: String,
}

#[derive(Debug, Default)]
struct Steps(Vec<Step>);

impl Steps {
    fn record(&mut self, operation: &'static str, outcome: impl Into<String>) {
        let index = self.0.len() + 1;
        self.0.push(Step {
            index,
            operation,
            outcome: outcome.into(),
        });
    }
}

/// Execute the demo
pub async fn execute(args: &DemoArgs, config: AppConfig, format: OutputFormat) -> anyhow::Result<()> {
    let signer = Arc::new(demo_signer(&config)?);
    let users = InMemoryUserStore::new();
    let tokens = InMemoryRefreshTokenStore::new();

    let manager = SessionManager::new(
        signer,
        Arc::new(users.clone()),
        Arc::new(tokens.clone()),
        Arc::new(Argon2PasswordVerifier::new()),
        Arc::new(RandomTokenGenerator::new()),
        config.session.clone(),
    );
    let dispatcher = Arc::new(NotificationDispatcher::start(
        Arc::new(LogNotificationSender),
        &config.worker,
    ));
    let sessions = NotifyingSessionManager::new(
        Arc::new(manager),
        dispatcher.clone(),
        config.notification.clone(),
    );

    let ctx = RequestContext::new()
        .with_timeout(Duration::from_secs(30))
        .with_client(ClientMeta::new(
            Some(format!("authkeep-cli/{}", env!("CARGO_PKG_VERSION"))),
            Some(IpAddr::V4(Ipv4Addr::LOCALHOST)),
        ));
    let mut steps = Steps::default();

    let signup = sessions
        .signup(
            &ctx,
            SignupInput {
                email: args.email.clone(),
                password: args.password.clone(),
            },
        )
        .await
        .context("signup")?;
    steps.record("signup", format!("user {}", signup.user_id));

    let first = sessions
        .login(
            &ctx,
            LoginInput {
                email: args.email.clone(),
                password: args.password.clone(),
            },
        )
        .await
        .context("login")?;
    steps.record(
        "login",
        format!(
            "access token with {} segments, session renewable for {}s",
            first.access_token.split('.').count(),
            first.expires_in
        ),
    );

    let second = sessions
        .refresh(
            &ctx,
            RefreshInput {
                refresh_token: first.refresh_token.clone(),
            },
        )
        .await
        .context("refresh")?;
    let retired = tokens
        .get_by_token(&ctx, &first.refresh_token)
        .await?
        .context("rotated token missing from store")?;
    steps.record(
        "refresh",
        format!("new pair issued, previous token {}", retired.state_at(chrono::Utc::now())),
    );

    match sessions
        .refresh(
            &ctx,
            RefreshInput {
                refresh_token: first.refresh_token.clone(),
            },
        )
        .await
    {
        Err(AuthError::InvalidToken) => steps.record("refresh (replay)", "rejected: invalid_token"),
        Err(e) => bail!("replayed refresh failed unexpectedly: {}", e),
        Ok(_) => bail!("replayed refresh token was accepted"),
    }

    sessions
        .verify_email(
            &ctx,
            VerifyEmailInput {
                email: args.email.clone(),
                token: signup.verification_token.clone(),
            },
        )
        .await
        .context("verify email")?;
    let user = sessions.get_user_by_id(&ctx, signup.user_id).await?;
    steps.record("verify email", format!("email_verified = {}", user.email_verified));

    sessions
        .logout(
            &ctx,
            LogoutInput {
                refresh_token: second.refresh_token.clone(),
            },
        )
        .await
        .context("logout")?;
    match sessions
        .refresh(
            &ctx,
            RefreshInput {
                refresh_token: second.refresh_token.clone(),
            },
        )
        .await
    {
        Err(AuthError::InvalidToken) => steps.record("logout", "token revoked, refresh rejected"),
        Err(e) => bail!("refresh after logout failed unexpectedly: {}", e),
        Ok(_) => bail!("refresh token still usable after logout"),
    }

    let cleanup = SessionCleanup::from_config(Arc::new(tokens.clone()), &config.session);
    let removed = cleanup.run_cleanup(&ctx).await?;
    steps.record(
        "cleanup",
        format!("{} removed, {} retained for replay detection", removed, tokens.len()),
    );

    let drained = dispatcher.shutdown().await;
    let stats = dispatcher.stats();
    steps.record(
        "notifications",
        format!(
            "{} queued, {} delivered, {} dropped{}",
            stats.enqueued,
            stats.processed,
            stats.dropped,
            if drained { "" } else { " (shutdown timed out)" }
        ),
    );

    output::print_list(&steps.0, format);
    if format == OutputFormat::Table {
        output::print_success(&format!("Lifecycle completed for {} users", users.len()));
    }
    Ok(())
}

/// Signer from configuration, or an ephemeral HMAC secret when none is configured.
fn demo_signer(config: &AppConfig) -> anyhow::Result<TokenSigner> {
    if config.jwt.is_symmetric() && config.jwt.secret.is_empty() {
        tracing::warn!("No jwt.secret configured, signing demo tokens with an ephemeral secret");
        let secret = RandomTokenGenerator::new().generate(64)?;
        let signer = TokenSigner::configure(
            &config.jwt.algorithm,
            KeyMaterial::Secret(secret.into_bytes()),
            config.jwt.issuer.clone(),
            Duration::from_secs(config.jwt.access_token_ttl_seconds),
        )?;
        return Ok(signer.with_leeway(config.jwt.leeway_seconds));
    }

    TokenSigner::from_config(&config.jwt).context("signer configuration")
}
