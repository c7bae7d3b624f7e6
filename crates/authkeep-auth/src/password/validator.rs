//! Email and password policy for new credentials.

use validator::ValidateEmail;

use authkeep_core::config::SessionConfig;

use crate::error::{AuthError, AuthResult};

/// Validates credentials supplied at signup.
#[derive(Debug, Clone)]
pub struct CredentialPolicy {
    /// Minimum password length, in characters.
    min_password_length: usize,
}

impl CredentialPolicy {
    /// Creates a policy with the given minimum password length.
    pub fn new(min_password_length: usize) -> Self {
        Self {
            min_password_length,
        }
    }

    /// Creates a policy from session configuration.
    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(config.password_min_length)
    }

    /// Canonical form used for storage and lookup.
    pub fn normalize_email(email: &str) -> String {
        email.trim().to_lowercase()
    }

    /// Accepts a well-formed address whose domain ends in an alphabetic TLD
    /// of at least two letters.
    pub fn validate_email(&self, email: &str) -> AuthResult<()> {
        if !email.validate_email() {
            return Err(AuthError::InvalidEmail);
        }

        let domain = email.rsplit_once('@').map(|(_, d)| d).unwrap_or_default();
        let tld = domain.rsplit_once('.').map(|(_, t)| t).unwrap_or_default();
        if tld.len() < 2 || !tld.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(AuthError::InvalidEmail);
        }

        Ok(())
    }

    /// Enforces the minimum length.
    pub fn validate_password(&self, password: &str) -> AuthResult<()> {
        if password.chars().count() < self.min_password_length {
            return Err(AuthError::WeakPassword(format!(
                "must be at least {} characters long",
                self.min_password_length
            )));
        }
        Ok(())
    }
}

impl Default for CredentialPolicy {
    fn default() -> Self {
        Self::from_config(&SessionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(CredentialPolicy::normalize_email("  A@Example.COM "), "a@example.com");
    }

    #[test]
    fn test_valid_emails() {
        let policy = CredentialPolicy::default();
        for email in ["a@example.com", "first.last+tag@sub.example.org", "x_y@host.io"] {
            assert!(policy.validate_email(email).is_ok(), "{email}");
        }
    }

    #[test]
    fn test_invalid_emails() {
        let policy = CredentialPolicy::default();
        for email in ["", "plain", "@example.com", "a@", "a@localhost", "a@example.c", "a@example.123"] {
            assert!(
                matches!(policy.validate_email(email), Err(AuthError::InvalidEmail)),
                "{email}"
            );
        }
    }

    #[test]
    fn test_password_length() {
        let policy = CredentialPolicy::new(8);
        assert!(policy.validate_password("password123").is_ok());
        assert!(policy.validate_password("12345678").is_ok());
        assert!(matches!(
            policy.validate_password("1234567"),
            Err(AuthError::WeakPassword(_))
        ));
    }
}
