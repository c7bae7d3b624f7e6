//! Refresh token entity and its lifecycle state.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use authkeep_core::types::{ClientMeta, UserId};

/// A stored refresh token.
///
/// The token value is opaque: validity is established only by looking the
/// record up. A token is valid iff it is not revoked and `now < expires_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshToken {
    /// Opaque random token value, unique across all sessions.
    pub token: String,
    /// The user this session belongs to.
    pub user_id: UserId,
    /// When the token was issued.
    pub created_at: DateTime<Utc>,
    /// When the token stops being accepted.
    pub expires_at: DateTime<Utc>,
    /// Whether the token has been revoked or rotated.
    pub revoked: bool,
    /// When the token was revoked.
    pub revoked_at: Option<DateTime<Utc>>,
    /// The token that superseded this one on rotation.
    pub replaced_by: Option<String>,
    /// User-Agent of the client the token was issued to.
    pub user_agent: Option<String>,
    /// Address of the client the token was issued to.
    pub ip_address: Option<std::net::IpAddr>,
    /// Last time the token was presented.
    pub last_used_at: Option<DateTime<Utc>>,
}

/// Lifecycle state of a refresh token.
///
/// `Expired` is derived from the clock and never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenState {
    /// Usable for a refresh.
    Active,
    /// Superseded by a newer token.
    Rotated,
    /// Explicitly revoked by logout.
    Revoked,
    /// Past its expiry time.
    Expired,
}

impl TokenState {
    /// Terminal states never return to `Active`.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Active)
    }
}

impl fmt::Display for TokenState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Rotated => write!(f, "rotated"),
            Self::Revoked => write!(f, "revoked"),
            Self::Expired => write!(f, "expired"),
        }
    }
}

impl RefreshToken {
    /// Build a new active token for `user_id` valid for `ttl` from `now`.
    pub fn issue(
        token: impl Into<String>,
        user_id: UserId,
        ttl: Duration,
        client: &ClientMeta,
        now: DateTime<Utc>,
    ) -> Self {
        Self::issue_until(token, user_id, now + ttl, client, now)
    }

    /// Build a new active token for `user_id` created at `now` and valid until `expires_at`.
    pub fn issue_until(
        token: impl Into<String>,
        user_id: UserId,
        expires_at: DateTime<Utc>,
        client: &ClientMeta,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            token: token.into(),
            user_id,
            created_at: now,
            expires_at,
            revoked: false,
            revoked_at: None,
            replaced_by: None,
            user_agent: client.user_agent.clone(),
            ip_address: client.ip_address,
            last_used_at: None,
        }
    }

    /// Valid iff not revoked and not yet expired at `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && now < self.expires_at
    }

    /// Validity against the current clock.
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    /// Lifecycle state at `now`.
    pub fn state_at(&self, now: DateTime<Utc>) -> TokenState {
        if self.revoked {
            if self.replaced_by.is_some() {
                TokenState::Rotated
            } else {
                TokenState::Revoked
            }
        } else if now >= self.expires_at {
            TokenState::Expired
        } else {
            TokenState::Active
        }
    }

    /// Revoke the token. Returns false if it was already revoked.
    pub fn revoke(&mut self, now: DateTime<Utc>) -> bool {
        if self.revoked {
            return false;
        }
        self.revoked = true;
        self.revoked_at = Some(now);
        true
    }

    /// Retire the token in favour of `successor`. Returns false unless the
    /// token was valid at `now`.
    pub fn rotate_to(&mut self, successor: impl Into<String>, now: DateTime<Utc>) -> bool {
        if !self.is_valid_at(now) {
            return false;
        }
        self.revoked = true;
        self.revoked_at = Some(now);
        self.replaced_by = Some(successor.into());
        self.last_used_at = Some(now);
        true
    }

    /// Whether cleanup may delete this record: expired at `now`, or revoked
    /// before `revoked_before`.
    pub fn is_purgeable(&self, now: DateTime<Utc>, revoked_before: DateTime<Utc>) -> bool {
        self.expires_at < now
            || (self.revoked && self.revoked_at.is_some_and(|at| at < revoked_before))
    }
}
