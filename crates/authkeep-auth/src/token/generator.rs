//! Cryptographically secure opaque tokens for refresh and verification flows.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;

use authkeep_core::config::session::MIN_TOKEN_BYTES;
use authkeep_core::error::AppError;
use authkeep_core::result::AppResult;

/// Produces unguessable opaque token strings.
pub trait SecureTokenGenerator: Send + Sync + std::fmt::Debug {
    /// Generate a token from `byte_len` random bytes. Fewer than
    /// [`MIN_TOKEN_BYTES`] is rejected.
    fn generate(&self, byte_len: usize) -> AppResult<String>;
}

/// Draws bytes from the thread-local CSPRNG and encodes them as URL-safe base64.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomTokenGenerator;

impl RandomTokenGenerator {
    /// Creates a new generator.
    pub fn new() -> Self {
        Self
    }
}

impl SecureTokenGenerator for RandomTokenGenerator {
    fn generate(&self, byte_len: usize) -> AppResult<String> {
        if byte_len < MIN_TOKEN_BYTES {
            return Err(AppError::validation(format!(
                "token length must be at least {MIN_TOKEN_BYTES} bytes, got {byte_len}"
            )));
        }
        let mut bytes = vec![0u8; byte_len];
        rand::rng().fill_bytes(&mut bytes);
        Ok(URL_SAFE_NO_PAD.encode(bytes))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_length_and_alphabet() {
        let token = RandomTokenGenerator::new().generate(32).unwrap();
        assert_eq!(token.len(), 43);
        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn test_tokens_are_unique() {
        let generator = RandomTokenGenerator::new();
        let tokens: HashSet<String> = (0..1000).map(|_| generator.generate(32).unwrap()).collect();
        assert_eq!(tokens.len(), 1000);
    }

    #[test]
    fn test_short_lengths_rejected() {
        let generator = RandomTokenGenerator::new();
        assert!(generator.generate(0).is_err());
        assert!(generator.generate(1).is_err());
        assert!(generator.generate(MIN_TOKEN_BYTES - 1).is_err());
        assert_eq!(generator.generate(MIN_TOKEN_BYTES).unwrap().len(), 22);
    }
}
