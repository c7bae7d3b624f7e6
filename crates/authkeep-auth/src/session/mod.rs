//! Session lifecycle: signup, login, refresh-token rotation, logout, email
//! verification, plus the notifying wrapper and expired-token cleanup.

pub mod cleanup;
pub mod manager;
pub mod notifying;
pub mod types;

pub use cleanup::SessionCleanup;
pub use manager::SessionManager;
pub use notifying::{Notification, NotificationSink, NotifyingSessionManager};
pub use types::{
    AuthTokens, LoginInput, LogoutInput, RefreshInput, ResendVerificationOutput, SignupInput,
    SignupOutput, VerifyEmailInput,
};
