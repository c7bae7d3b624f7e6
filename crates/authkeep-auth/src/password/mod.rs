//! Password hashing contract and credential policy.

pub mod hasher;
pub mod validator;

pub use hasher::{Argon2PasswordVerifier, PasswordVerifier};
pub use validator::CredentialPolicy;
