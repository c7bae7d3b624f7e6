//! Typed error enumeration for the token and session lifecycle.

use thiserror::Error;

use authkeep_core::error::{AppError, ErrorKind};

/// Result alias for lifecycle operations.
pub type AuthResult<T> = Result<T, AuthError>;

/// Every way a signer or session operation can fail.
///
/// Authentication failures are deliberately coarse: an unknown email and a
/// wrong password both yield `InvalidCredentials`, and an unknown, revoked or
/// expired refresh token all yield `InvalidToken`.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Signer construction failed; the process should not start.
    #[error("Invalid signer configuration: {0}")]
    Configuration(String),

    /// A correctly configured signer failed to produce a token.
    #[error("Failed to sign access token: {0}")]
    Signing(String),

    /// The email address is not well formed.
    #[error("Invalid email address")]
    InvalidEmail,

    /// The password does not satisfy the credential policy.
    #[error("Password does not meet requirements: {0}")]
    WeakPassword(String),

    /// Unknown email or wrong password.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Refresh or verification token is unknown, revoked, expired or mismatched.
    #[error("Invalid or expired token")]
    InvalidToken,

    /// Access token is outside its validity window.
    #[error("Token has expired")]
    ExpiredToken,

    /// Access token was signed with an algorithm other than the configured one.
    #[error("Unexpected signing method")]
    WrongSigningMethod,

    /// Access token signature does not verify.
    #[error("Invalid token signature")]
    InvalidSignature,

    /// Access token could not be parsed.
    #[error("Malformed token")]
    MalformedToken,

    /// An account with this email already exists.
    #[error("Email is already registered")]
    DuplicateEmail,

    /// No user with the given id or email.
    #[error("User not found")]
    UserNotFound,

    /// The email address is already verified.
    #[error("Email is already verified")]
    AlreadyVerified,

    /// A store, verifier or generator failed.
    #[error(transparent)]
    Collaborator(#[from] AppError),
}

impl AuthError {
    /// Broad category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::Signing(_) => ErrorKind::Internal,
            Self::InvalidEmail | Self::WeakPassword(_) => ErrorKind::Validation,
            Self::InvalidCredentials
            | Self::InvalidToken
            | Self::ExpiredToken
            | Self::WrongSigningMethod
            | Self::InvalidSignature
            | Self::MalformedToken => ErrorKind::Authentication,
            Self::DuplicateEmail | Self::AlreadyVerified => ErrorKind::Conflict,
            Self::UserNotFound => ErrorKind::NotFound,
            Self::Collaborator(err) => err.kind,
        }
    }

    /// Stable machine-readable code for transport layers.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration_error",
            Self::Signing(_) => "signing_error",
            Self::InvalidEmail => "invalid_email",
            Self::WeakPassword(_) => "weak_password",
            Self::InvalidCredentials => "invalid_credentials",
            Self::InvalidToken => "invalid_token",
            Self::ExpiredToken => "expired_token",
            Self::WrongSigningMethod => "wrong_signing_method",
            Self::InvalidSignature => "invalid_signature",
            Self::MalformedToken => "malformed_token",
            Self::DuplicateEmail => "duplicate_email",
            Self::UserNotFound => "user_not_found",
            Self::AlreadyVerified => "already_verified",
            Self::Collaborator(_) => "internal_error",
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Collaborator(inner) => inner,
            other => AppError::new(other.kind(), other.to_string()),
        }
    }
}
