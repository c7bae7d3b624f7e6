//! Plain input and output structs of the session operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use authkeep_core::types::UserId;

/// Signup request.
#[derive(Clone, Serialize, Deserialize)]
pub struct SignupInput {
    /// Email address; normalized before use.
    pub email: String,
    /// Plaintext password.
    pub password: String,
}

impl std::fmt::Debug for SignupInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignupInput")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Result of a successful signup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupOutput {
    /// Id of the new user.
    pub user_id: UserId,
    /// Normalized email address.
    pub email: String,
    /// Opaque email verification token.
    pub verification_token: String,
    /// When the verification token stops being accepted.
    pub verification_expires_at: DateTime<Utc>,
}

/// Login request.
#[derive(Clone, Serialize, Deserialize)]
pub struct LoginInput {
    /// Email address; normalized before lookup.
    pub email: String,
    /// Plaintext password.
    pub password: String,
}

impl std::fmt::Debug for LoginInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginInput")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Refresh request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshInput {
    /// Refresh token to rotate.
    pub refresh_token: String,
}

/// Logout request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogoutInput {
    /// Refresh token to revoke.
    pub refresh_token: String,
}

/// Email verification request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyEmailInput {
    /// Email address; normalized before lookup.
    pub email: String,
    /// Verification token delivered to the user.
    pub token: String,
}

/// Result of reissuing a verification token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResendVerificationOutput {
    /// The user the token belongs to.
    pub user_id: UserId,
    /// Normalized email address.
    pub email: String,
    /// The new verification token; the previous one no longer matches.
    pub verification_token: String,
    /// When the new token stops being accepted.
    pub verification_expires_at: DateTime<Utc>,
}

/// Credentials returned by login and refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthTokens {
    /// Signed access token.
    pub access_token: String,
    /// Opaque refresh token.
    pub refresh_token: String,
    /// Always `"Bearer"`.
    pub token_type: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    /// When the refresh token expires.
    pub refresh_expires_at: DateTime<Utc>,
    /// The authenticated user.
    pub user_id: UserId,
}
