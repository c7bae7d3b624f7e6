//! Persistence contracts for users and refresh tokens.
//!
//! The session manager holds no shared mutable state of its own; every
//! concurrency guarantee lives behind these traits. In particular
//! [`RefreshTokenStore::rotate`] must be an atomic compare-and-set so that a
//! refresh token submitted twice concurrently is rotated at most once.

pub mod memory;
pub mod refresh_token_store;
pub mod user_store;

pub use memory::{InMemoryRefreshTokenStore, InMemoryUserStore};
pub use refresh_token_store::RefreshTokenStore;
pub use user_store::UserStore;
