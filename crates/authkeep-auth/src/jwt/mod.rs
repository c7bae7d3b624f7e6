//! Access-token claims, key material, and the algorithm-pinned signer.

pub mod claims;
pub mod keys;
pub mod signer;

pub use claims::Claims;
pub use keys::{KeyMaterial, SigningAlgorithm};
pub use signer::TokenSigner;
