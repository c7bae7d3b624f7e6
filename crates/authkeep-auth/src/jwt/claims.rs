//! Claims payload carried inside every access token.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use authkeep_core::types::UserId;

/// Access-token payload. Exists only inside a signed token; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user ID.
    pub sub: String,
    /// Issuer configured on the signer.
    pub iss: String,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: i64,
    /// Not-before timestamp (seconds since epoch).
    pub nbf: i64,
    /// Expiration timestamp (seconds since epoch).
    pub exp: i64,
    /// The user ID, typed.
    pub user_id: UserId,
    /// Email address at the time of issuance.
    pub email: String,
    /// Whether the email was verified at the time of issuance.
    pub email_verified: bool,
}

impl Claims {
    /// Build claims for `user_id` valid from `now` for `ttl_seconds`.
    pub fn new(
        user_id: UserId,
        email: impl Into<String>,
        email_verified: bool,
        issuer: impl Into<String>,
        now: i64,
        ttl_seconds: i64,
    ) -> Self {
        Self {
            sub: user_id.to_string(),
            iss: issuer.into(),
            iat: now,
            nbf: now,
            exp: now.saturating_add(ttl_seconds),
            user_id,
            email: email.into(),
            email_verified,
        }
    }

    /// Returns the expiration as a `DateTime<Utc>`.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }

    /// Returns the issue time as a `DateTime<Utc>`.
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.iat, 0)
    }

    /// Whether `now` lies in `[nbf - leeway, exp + leeway)`.
    pub fn is_within_window(&self, now: i64, leeway: i64) -> bool {
        now.saturating_add(leeway) >= self.nbf && now < self.exp.saturating_add(leeway)
    }

    /// Returns the remaining TTL in seconds (0 if expired).
    pub fn remaining_ttl_seconds(&self, now: i64) -> u64 {
        u64::try_from(self.exp - now).unwrap_or(0)
    }
}
