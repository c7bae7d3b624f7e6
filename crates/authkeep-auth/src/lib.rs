//! # authkeep-auth
//!
//! Token and session lifecycle for Authkeep.
//!
//! ## Modules
//!
//! - `jwt`: access-token claims, key material, and the algorithm-pinned `TokenSigner`
//! - `password`: `PasswordVerifier` contract, Argon2id implementation, credential policy
//! - `token`: `SecureTokenGenerator` contract for opaque refresh and verification tokens
//! - `store`: `UserStore` / `RefreshTokenStore` contracts and in-memory implementations
//! - `session`: `SessionManager`, `NotifyingSessionManager`, and expired-token cleanup
//! - `error`: the typed `AuthError` enumeration

pub mod error;
pub mod jwt;
pub mod password;
pub mod session;
pub mod store;
pub mod token;

pub use error::{AuthError, AuthResult};
pub use jwt::{Claims, KeyMaterial, SigningAlgorithm, TokenSigner};
pub use password::{Argon2PasswordVerifier, CredentialPolicy, PasswordVerifier};
pub use session::{
    Notification, NotificationSink, NotifyingSessionManager, SessionCleanup, SessionManager,
};
pub use store::{InMemoryRefreshTokenStore, InMemoryUserStore, RefreshTokenStore, UserStore};
pub use token::{RandomTokenGenerator, SecureTokenGenerator};
