//! Session and credential lifecycle configuration.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Fewest random bytes a refresh or verification token may carry (128 bits).
pub const MIN_TOKEN_BYTES: usize = 16;

/// Longest TTL accepted for any token, ten years in seconds.
pub const MAX_TTL_SECONDS: u64 = 10 * 365 * 24 * 3600;

/// Refresh-token, verification-token and credential policy settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Refresh token TTL in seconds.
    #[serde(default = "default_refresh_ttl")]
    pub refresh_token_ttl_seconds: u64,
    /// Number of random bytes in refresh and verification tokens.
    #[serde(default = "default_token_bytes")]
    pub token_bytes: usize,
    /// Email verification token TTL in seconds.
    #[serde(default = "default_verification_ttl")]
    pub verification_token_ttl_seconds: u64,
    /// Minimum password length.
    #[serde(default = "default_password_min")]
    pub password_min_length: usize,
    /// Days a revoked refresh token is retained before cleanup deletes it.
    #[serde(default = "default_retention")]
    pub revoked_retention_days: u64,
    /// Interval in seconds between cleanup runs.
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_seconds: u64,
}

impl SessionConfig {
    /// Reject settings that would weaken tokens or overflow expiry arithmetic.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.token_bytes < MIN_TOKEN_BYTES {
            return Err(AppError::configuration(format!(
                "session.token_bytes must be at least {MIN_TOKEN_BYTES}, got {}",
                self.token_bytes
            )));
        }
        check_ttl("session.refresh_token_ttl_seconds", self.refresh_token_ttl_seconds)?;
        check_ttl(
            "session.verification_token_ttl_seconds",
            self.verification_token_ttl_seconds,
        )?;
        check_ttl(
            "session.revoked_retention_days",
            self.revoked_retention_days.saturating_mul(24 * 3600),
        )?;
        if self.cleanup_interval_seconds == 0 {
            return Err(AppError::configuration(
                "session.cleanup_interval_seconds must be positive",
            ));
        }
        if self.password_min_length == 0 {
            return Err(AppError::configuration(
                "session.password_min_length must be positive",
            ));
        }
        Ok(())
    }
}

fn check_ttl(name: &str, seconds: u64) -> Result<(), AppError> {
    if seconds == 0 || seconds > MAX_TTL_SECONDS {
        return Err(AppError::configuration(format!(
            "{name} must be between 1 and {MAX_TTL_SECONDS} seconds, got {seconds}"
        )));
    }
    Ok(())
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            refresh_token_ttl_seconds: default_refresh_ttl(),
            token_bytes: default_token_bytes(),
            verification_token_ttl_seconds: default_verification_ttl(),
            password_min_length: default_password_min(),
            revoked_retention_days: default_retention(),
            cleanup_interval_seconds: default_cleanup_interval(),
        }
    }
}

fn default_refresh_ttl() -> u64 {
    7 * 24 * 3600
}

fn default_token_bytes() -> usize {
    32
}

fn default_verification_ttl() -> u64 {
    24 * 3600
}

fn default_password_min() -> usize {
    8
}

fn default_retention() -> u64 {
    30
}

fn default_cleanup_interval() -> u64 {
    3600
}
