//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use argon2::Params;

use authkeep_auth::session::{LoginInput, SignupInput, SignupOutput, AuthTokens};
use authkeep_auth::{
    Argon2PasswordVerifier, InMemoryRefreshTokenStore, InMemoryUserStore, KeyMaterial,
    NotificationSink, NotifyingSessionManager, RandomTokenGenerator, SessionManager, TokenSigner,
};
use authkeep_core::config::{NotificationConfig, SessionConfig};
use authkeep_core::context::RequestContext;

/// Password used by every test user.
pub const PASSWORD: &str = "password123";

/// HMAC secret for test signers.
pub const SECRET: &[u8] = b"integration-test-secret-0123456789abcdef";

/// Session manager wired over in-memory stores
pub struct TestApp {
    /// The manager under test
    pub manager: Arc<SessionManager>,
    /// Direct handle on the user store
    pub users: InMemoryUserStore,
    /// Direct handle on the refresh token store
    pub tokens: InMemoryRefreshTokenStore,
}

impl TestApp {
    /// Create a new test application with default session settings
    pub fn new() -> Self {
        Self::with_config(SessionConfig::default())
    }

    /// Create a new test application
    pub fn with_config(config: SessionConfig) -> Self {
        let users = InMemoryUserStore::new();
        let tokens = InMemoryRefreshTokenStore::new();

        let manager = SessionManager::new(
            Arc::new(signer()),
            Arc::new(users.clone()),
            Arc::new(tokens.clone()),
            Arc::new(fast_verifier()),
            Arc::new(RandomTokenGenerator::new()),
            config,
        );

        Self {
            manager: Arc::new(manager),
            users,
            tokens,
        }
    }

    /// Wrap the manager with a notification sink
    pub fn notifying(
        &self,
        sink: Arc<dyn NotificationSink>,
        config: NotificationConfig,
    ) -> NotifyingSessionManager {
        NotifyingSessionManager::new(Arc::clone(&self.manager), sink, config)
    }

    /// Sign up a user with the shared test password
    pub async fn signup(&self, email: &str) -> SignupOutput {
        self.manager
            .signup(
                &RequestContext::new(),
                SignupInput {
                    email: email.to_string(),
                    password: PASSWORD.to_string(),
                },
            )
            .await
            .expect("signup")
    }

    /// Log a user in with the shared test password
    pub async fn login(&self, email: &str) -> AuthTokens {
        self.manager
            .login(
                &RequestContext::new(),
                LoginInput {
                    email: email.to_string(),
                    password: PASSWORD.to_string(),
                },
            )
            .await
            .expect("login")
    }
}

/// HS256 signer with a 15 minute TTL
pub fn signer() -> TokenSigner {
    TokenSigner::configure(
        "HS256",
        KeyMaterial::Secret(SECRET.to_vec()),
        "authkeep-test",
        Duration::from_secs(900),
    )
    .expect("signer")
}

/// Argon2id with minimal cost so tests stay fast
pub fn fast_verifier() -> Argon2PasswordVerifier {
    Argon2PasswordVerifier::with_params(Params::new(1024, 1, 1, None).expect("params"))
}
