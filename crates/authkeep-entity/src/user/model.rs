//! User entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use authkeep_core::types::UserId;

/// A registered account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique user identifier.
    pub id: UserId,
    /// Normalized email address, unique across users.
    pub email: String,
    /// Argon2 password hash.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    /// Whether the email address has been confirmed.
    pub email_verified: bool,
    /// Outstanding verification token, cleared once verified.
    #[serde(skip_serializing, default)]
    pub email_verification_token: Option<String>,
    /// When the outstanding verification token stops being accepted.
    pub email_verification_expires_at: Option<DateTime<Utc>>,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Build a new, unverified user.
    pub fn new(
        email: impl Into<String>,
        password_hash: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: UserId::new(),
            email: email.into(),
            password_hash: password_hash.into(),
            email_verified: false,
            email_verification_token: None,
            email_verification_expires_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the outstanding verification token. The previous one stops matching.
    pub fn set_email_verification_token(
        &mut self,
        token: impl Into<String>,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) {
        self.email_verification_token = Some(token.into());
        self.email_verification_expires_at = Some(expires_at);
        self.updated_at = now;
    }

    /// Check `token` against the outstanding verification token and its expiry.
    ///
    /// Token bytes are compared in constant time.
    pub fn is_email_verification_token_valid(&self, token: &str, now: DateTime<Utc>) -> bool {
        match (&self.email_verification_token, self.email_verification_expires_at) {
            (Some(stored), Some(expires_at)) => {
                let matches: bool = stored.as_bytes().ct_eq(token.as_bytes()).into();
                !token.is_empty() && matches && now < expires_at
            }
            _ => false,
        }
    }

    /// Mark the email verified and clear the verification token.
    pub fn mark_email_verified(&mut self, now: DateTime<Utc>) {
        self.email_verified = true;
        self.email_verification_token = None;
        self.email_verification_expires_at = None;
        self.updated_at = now;
    }
}
