//! Opaque random token generation.

pub mod generator;

pub use generator::{RandomTokenGenerator, SecureTokenGenerator};
