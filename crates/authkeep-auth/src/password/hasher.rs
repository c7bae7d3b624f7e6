//! Argon2id password hashing and verification.

use std::sync::Arc;

use argon2::{
    Argon2, Params,
    password_hash::{
        PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString, rand_core::OsRng,
    },
};
use async_trait::async_trait;

use authkeep_core::context::RequestContext;
use authkeep_core::error::AppError;
use authkeep_core::result::AppResult;

/// Credential hashing and comparison.
///
/// Implementations are expected to be slow on purpose and must honour the
/// caller's cancellation and deadline.
#[async_trait]
pub trait PasswordVerifier: Send + Sync + std::fmt::Debug {
    /// Hash a plaintext password.
    async fn hash(&self, ctx: &RequestContext, plaintext: &str) -> AppResult<String>;

    /// Compare a plaintext password with a stored hash.
    ///
    /// Returns `Ok(true)` if the password matches, `Ok(false)` if not.
    async fn compare(&self, ctx: &RequestContext, plaintext: &str, hash: &str) -> AppResult<bool>;
}

/// Argon2id hasher. Work runs on the blocking pool so request tasks are not stalled.
#[derive(Debug, Clone)]
pub struct Argon2PasswordVerifier {
    /// Shared hasher configuration.
    argon2: Arc<Argon2<'static>>,
}

impl Argon2PasswordVerifier {
    /// Creates a hasher with the library's default cost parameters.
    pub fn new() -> Self {
        Self {
            argon2: Arc::new(Argon2::default()),
        }
    }

    /// Creates a hasher with explicit cost parameters.
    pub fn with_params(params: Params) -> Self {
        Self {
            argon2: Arc::new(Argon2::new(
                argon2::Algorithm::Argon2id,
                argon2::Version::V0x13,
                params,
            )),
        }
    }

    fn hash_blocking(argon2: &Argon2<'_>, plaintext: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| AppError::internal(format!("Password hashing failed: {e}")))?;
        Ok(hash.to_string())
    }

    fn compare_blocking(argon2: &Argon2<'_>, plaintext: &str, hash: &str) -> AppResult<bool> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| AppError::internal(format!("Invalid password hash format: {e}")))?;

        match argon2.verify_password(plaintext.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AppError::internal(format!(
                "Password verification failed: {e}"
            ))),
        }
    }
}

impl Default for Argon2PasswordVerifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PasswordVerifier for Argon2PasswordVerifier {
    async fn hash(&self, ctx: &RequestContext, plaintext: &str) -> AppResult<String> {
        let argon2 = Arc::clone(&self.argon2);
        let plaintext = plaintext.to_owned();
        ctx.run(async move {
            tokio::task::spawn_blocking(move || Self::hash_blocking(&argon2, &plaintext))
                .await
                .map_err(|e| AppError::internal(format!("Password hashing task failed: {e}")))?
        })
        .await
    }

    async fn compare(&self, ctx: &RequestContext, plaintext: &str, hash: &str) -> AppResult<bool> {
        let argon2 = Arc::clone(&self.argon2);
        let plaintext = plaintext.to_owned();
        let hash = hash.to_owned();
        ctx.run(async move {
            tokio::task::spawn_blocking(move || Self::compare_blocking(&argon2, &plaintext, &hash))
                .await
                .map_err(|e| {
                    AppError::internal(format!("Password verification task failed: {e}"))
                })?
        })
        .await
    }
}
