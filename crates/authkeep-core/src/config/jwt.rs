//! Access-token signing configuration.

use serde::{Deserialize, Serialize};

/// Access-token signer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Signing algorithm: `HS256`, `HS384`, `HS512`, `RS256`, `RS384` or `RS512`.
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
    /// Shared secret for the HMAC algorithms.
    #[serde(default)]
    pub secret: String,
    /// Path to the PEM-encoded RSA private key.
    #[serde(default)]
    pub private_key_path: String,
    /// Path to the PEM-encoded RSA public key.
    #[serde(default)]
    pub public_key_path: String,
    /// Value written to the `iss` claim.
    #[serde(default = "default_issuer")]
    pub issuer: String,
    /// Access token TTL in seconds.
    #[serde(default = "default_access_ttl")]
    pub access_token_ttl_seconds: u64,
    /// Clock-skew tolerance applied to `nbf` and `exp` checks, in seconds.
    #[serde(default)]
    pub leeway_seconds: u64,
}

impl JwtConfig {
    /// Returns true when an HMAC algorithm is configured.
    pub fn is_symmetric(&self) -> bool {
        self.algorithm.to_ascii_uppercase().starts_with("HS")
    }
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            algorithm: default_algorithm(),
            secret: String::new(),
            private_key_path: String::new(),
            public_key_path: String::new(),
            issuer: default_issuer(),
            access_token_ttl_seconds: default_access_ttl(),
            leeway_seconds: 0,
        }
    }
}

fn default_algorithm() -> String {
    "HS256".to_string()
}

fn default_issuer() -> String {
    "authkeep".to_string()
}

fn default_access_ttl() -> u64 {
    900
}
