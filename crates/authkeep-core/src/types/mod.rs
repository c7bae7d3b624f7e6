//! Shared value types.

pub mod client;
pub mod id;

pub use client::ClientMeta;
pub use id::UserId;
