//! # authkeep-entity
//!
//! Domain records persisted behind the store contracts: users with their
//! email-verification state, and refresh tokens with their lifecycle state.
//! Every entity derives `Debug`, `Clone`, `Serialize` and `Deserialize`.

pub mod session;
pub mod user;
