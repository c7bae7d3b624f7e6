//! Signing algorithm selection and key material loading.

use std::fmt;
use std::str::FromStr;

use jsonwebtoken::Algorithm;

use authkeep_core::config::JwtConfig;

use crate::error::{AuthError, AuthResult};

/// Supported access-token signing algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SigningAlgorithm {
    /// HMAC with SHA-256.
    Hs256,
    /// HMAC with SHA-384.
    Hs384,
    /// HMAC with SHA-512.
    Hs512,
    /// RSASSA-PKCS1-v1_5 with SHA-256.
    Rs256,
    /// RSASSA-PKCS1-v1_5 with SHA-384.
    Rs384,
    /// RSASSA-PKCS1-v1_5 with SHA-512.
    Rs512,
}

impl SigningAlgorithm {
    /// Returns true for the shared-secret family.
    pub fn is_hmac(self) -> bool {
        matches!(self, Self::Hs256 | Self::Hs384 | Self::Hs512)
    }
}

impl From<SigningAlgorithm> for Algorithm {
    fn from(alg: SigningAlgorithm) -> Self {
        match alg {
            SigningAlgorithm::Hs256 => Algorithm::HS256,
            SigningAlgorithm::Hs384 => Algorithm::HS384,
            SigningAlgorithm::Hs512 => Algorithm::HS512,
            SigningAlgorithm::Rs256 => Algorithm::RS256,
            SigningAlgorithm::Rs384 => Algorithm::RS384,
            SigningAlgorithm::Rs512 => Algorithm::RS512,
        }
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hs256 => write!(f, "HS256"),
            Self::Hs384 => write!(f, "HS384"),
            Self::Hs512 => write!(f, "HS512"),
            Self::Rs256 => write!(f, "RS256"),
            Self::Rs384 => write!(f, "RS384"),
            Self::Rs512 => write!(f, "RS512"),
        }
    }
}

impl FromStr for SigningAlgorithm {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HS256" => Ok(Self::Hs256),
            "HS384" => Ok(Self::Hs384),
            "HS512" => Ok(Self::Hs512),
            "RS256" => Ok(Self::Rs256),
            "RS384" => Ok(Self::Rs384),
            "RS512" => Ok(Self::Rs512),
            other => Err(AuthError::Configuration(format!(
                "unsupported signing algorithm '{other}'"
            ))),
        }
    }
}

/// Raw key material for a signer.
#[derive(Clone)]
pub enum KeyMaterial {
    /// Shared secret for the HMAC family.
    Secret(Vec<u8>),
    /// PEM-encoded RSA key pair.
    RsaPem {
        /// Private key, PKCS#1 or PKCS#8.
        private_pem: Vec<u8>,
        /// Public key, PKCS#1 or SPKI.
        public_pem: Vec<u8>,
    },
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Secret(_) => f.write_str("KeyMaterial::Secret(..)"),
            Self::RsaPem { .. } => f.write_str("KeyMaterial::RsaPem(..)"),
        }
    }
}

impl KeyMaterial {
    /// Shared secret.
    pub fn secret(secret: impl AsRef<[u8]>) -> Self {
        Self::Secret(secret.as_ref().to_vec())
    }

    /// RSA key pair from PEM bytes.
    pub fn rsa_pem(private_pem: impl AsRef<[u8]>, public_pem: impl AsRef<[u8]>) -> Self {
        Self::RsaPem {
            private_pem: private_pem.as_ref().to_vec(),
            public_pem: public_pem.as_ref().to_vec(),
        }
    }

    /// Load key material for the configured algorithm, reading PEM files for RSA.
    pub fn from_config(config: &JwtConfig) -> AuthResult<Self> {
        let algorithm: SigningAlgorithm = config.algorithm.parse()?;

        if algorithm.is_hmac() {
            if config.secret.is_empty() {
                return Err(AuthError::Configuration(format!(
                    "{algorithm} requires jwt.secret"
                )));
            }
            return Ok(Self::secret(&config.secret));
        }

        if config.private_key_path.is_empty() || config.public_key_path.is_empty() {
            return Err(AuthError::Configuration(format!(
                "{algorithm} requires both jwt.private_key_path and jwt.public_key_path"
            )));
        }

        let private_pem = read_pem(&config.private_key_path)?;
        let public_pem = read_pem(&config.public_key_path)?;
        Ok(Self::RsaPem {
            private_pem,
            public_pem,
        })
    }
}

fn read_pem(path: &str) -> AuthResult<Vec<u8>> {
    std::fs::read(path)
        .map_err(|e| AuthError::Configuration(format!("failed to read key file '{path}': {e}")))
}
