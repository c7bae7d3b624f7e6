//! Access-token issuance and validation pinned to one algorithm.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::jwk::{Jwk, JwkSet, PublicKeyUse};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, decode_header, encode,
};

use authkeep_core::config::JwtConfig;
use authkeep_core::types::UserId;

use super::claims::Claims;
use super::keys::{KeyMaterial, SigningAlgorithm};
use crate::error::{AuthError, AuthResult};

/// Key id written into the header of RSA-signed tokens.
const RSA_KEY_ID: &str = "default";

/// Issues and validates access tokens.
///
/// A signer is bound to exactly one algorithm for its lifetime. Tokens whose
/// header declares any other algorithm are rejected before the signature is
/// looked at. The signer holds no mutable state and is safe to share.
#[derive(Clone)]
pub struct TokenSigner {
    /// Configured algorithm.
    algorithm: SigningAlgorithm,
    /// Key used to sign.
    encoding_key: EncodingKey,
    /// Key used to verify.
    decoding_key: DecodingKey,
    /// Header template for issued tokens.
    header: Header,
    /// Signature and required-claim checks. Time checks are done separately.
    validation: Validation,
    /// Value of the `iss` claim.
    issuer: String,
    /// Access token TTL in seconds.
    ttl_seconds: i64,
    /// Clock-skew tolerance in seconds.
    leeway_seconds: i64,
    /// Verification key published to relying parties. Only set for RSA.
    public_key: Option<PublicKey>,
}

/// Exportable half of an RSA key pair.
#[derive(Debug, Clone)]
struct PublicKey {
    pem: String,
    jwks: JwkSet,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("algorithm", &self.algorithm)
            .field("issuer", &self.issuer)
            .field("ttl_seconds", &self.ttl_seconds)
            .field("leeway_seconds", &self.leeway_seconds)
            .finish()
    }
}

impl TokenSigner {
    /// Builds a signer, failing with [`AuthError::Configuration`] when the
    /// algorithm is unsupported or the key material does not fit it.
    ///
    /// The keys are exercised once by signing and verifying a throwaway token,
    /// so a mismatched or unparseable key pair is caught here rather than on
    /// the first request.
    pub fn configure(
        algorithm: &str,
        keys: KeyMaterial,
        issuer: impl Into<String>,
        ttl: Duration,
    ) -> AuthResult<Self> {
        let algorithm: SigningAlgorithm = algorithm.parse()?;
        let (encoding_key, decoding_key) = build_keys(algorithm, &keys)?;

        let ttl_seconds = i64::try_from(ttl.as_secs())
            .map_err(|_| AuthError::Configuration("access token TTL is too large".to_string()))?;

        let mut header = Header::new(algorithm.into());
        if !algorithm.is_hmac() {
            header.kid = Some(RSA_KEY_ID.to_string());
        }

        let mut validation = Validation::new(algorithm.into());
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "nbf", "iat", "sub", "iss"]);

        let public_key = export_public_key(algorithm, &keys, &encoding_key)?;

        let signer = Self {
            algorithm,
            encoding_key,
            decoding_key,
            header,
            validation,
            issuer: issuer.into(),
            ttl_seconds,
            leeway_seconds: 0,
            public_key,
        };

        signer
            .issue_at(
                UserId::new(),
                "self-check@authkeep.invalid",
                false,
                Utc::now().timestamp(),
            )
            .and_then(|check| signer.verify(&check))
            .map_err(|e| {
                AuthError::Configuration(format!("key material failed self-check: {e}"))
            })?;

        Ok(signer)
    }

    /// Builds a signer from configuration, loading PEM files when needed.
    pub fn from_config(config: &JwtConfig) -> AuthResult<Self> {
        let keys = KeyMaterial::from_config(config)?;
        let signer = Self::configure(
            &config.algorithm,
            keys,
            config.issuer.clone(),
            Duration::from_secs(config.access_token_ttl_seconds),
        )?;
        Ok(signer.with_leeway(config.leeway_seconds))
    }

    /// Tolerate `seconds` of clock skew on the `nbf` and `exp` checks.
    pub fn with_leeway(mut self, seconds: u64) -> Self {
        self.leeway_seconds = i64::try_from(seconds).unwrap_or(i64::MAX);
        self
    }

    /// The configured algorithm.
    pub fn algorithm(&self) -> SigningAlgorithm {
        self.algorithm
    }

    /// The configured issuer.
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Access token TTL in seconds.
    pub fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }

    /// PEM of the RSA verification key. Shared secrets are never exported.
    pub fn public_key_pem(&self) -> Option<&str> {
        self.public_key.as_ref().map(|k| k.pem.as_str())
    }

    /// Key set relying parties use to verify RSA-signed tokens. The single
    /// key carries the same `kid` as issued token headers.
    pub fn jwks(&self) -> Option<&JwkSet> {
        self.public_key.as_ref().map(|k| &k.jwks)
    }

    /// Issues an access token valid from now for the configured TTL.
    pub fn issue(&self, user_id: UserId, email: &str, email_verified: bool) -> AuthResult<String> {
        self.issue_at(user_id, email, email_verified, Utc::now().timestamp())
    }

    /// Issues an access token as if the current time were `now` (seconds since epoch).
    pub fn issue_at(
        &self,
        user_id: UserId,
        email: &str,
        email_verified: bool,
        now: i64,
    ) -> AuthResult<String> {
        let claims = Claims::new(
            user_id,
            email,
            email_verified,
            self.issuer.clone(),
            now,
            self.ttl_seconds,
        );

        encode(&self.header, &claims, &self.encoding_key)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    /// Validates an access token against the current time.
    pub fn validate(&self, token: &str) -> AuthResult<Claims> {
        self.validate_at(token, Utc::now().timestamp())
    }

    /// Validates an access token as if the current time were `now`.
    ///
    /// Checks, in order:
    /// 1. Header parses and declares the configured algorithm
    /// 2. Signature verifies and required claims are present
    /// 3. `nbf <= now < exp`, widened by the configured leeway
    pub fn validate_at(&self, token: &str, now: i64) -> AuthResult<Claims> {
        let claims = self.verify(token)?;

        if !claims.is_within_window(now, self.leeway_seconds) {
            return Err(AuthError::ExpiredToken);
        }

        Ok(claims)
    }

    /// Steps 1 and 2 of [`validate_at`](Self::validate_at).
    fn verify(&self, token: &str) -> AuthResult<Claims> {
        let header = decode_header(token).map_err(|_| AuthError::MalformedToken)?;

        if header.alg != Algorithm::from(self.algorithm) {
            return Err(AuthError::WrongSigningMethod);
        }

        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            match e.kind() {
                JwtErrorKind::InvalidSignature => AuthError::InvalidSignature,
                JwtErrorKind::InvalidAlgorithm => AuthError::WrongSigningMethod,
                JwtErrorKind::ExpiredSignature | JwtErrorKind::ImmatureSignature => {
                    AuthError::ExpiredToken
                }
                _ => AuthError::MalformedToken,
            }
        })?;

        Ok(data.claims)
    }
}

fn build_keys(
    algorithm: SigningAlgorithm,
    keys: &KeyMaterial,
) -> AuthResult<(EncodingKey, DecodingKey)> {
    match (algorithm.is_hmac(), keys) {
        (true, KeyMaterial::Secret(secret)) => {
            if secret.is_empty() {
                return Err(AuthError::Configuration(format!(
                    "{algorithm} requires a non-empty secret"
                )));
            }
            Ok((
                EncodingKey::from_secret(secret),
                DecodingKey::from_secret(secret),
            ))
        }
        (true, KeyMaterial::RsaPem { .. }) => Err(AuthError::Configuration(format!(
            "{algorithm} requires a shared secret, not an RSA key pair"
        ))),
        (false, KeyMaterial::Secret(_)) => Err(AuthError::Configuration(format!(
            "{algorithm} requires an RSA private and public key"
        ))),
        (false, KeyMaterial::RsaPem { private_pem, public_pem }) => {
            if private_pem.is_empty() || public_pem.is_empty() {
                return Err(AuthError::Configuration(format!(
                    "{algorithm} requires both a private and a public key"
                )));
            }
            let encoding = EncodingKey::from_rsa_pem(private_pem).map_err(|e| {
                AuthError::Configuration(format!("malformed RSA private key: {e}"))
            })?;
            let decoding = DecodingKey::from_rsa_pem(public_pem).map_err(|e| {
                AuthError::Configuration(format!("malformed RSA public key: {e}"))
            })?;
            Ok((encoding, decoding))
        }
    }
}

fn export_public_key(
    algorithm: SigningAlgorithm,
    keys: &KeyMaterial,
    encoding_key: &EncodingKey,
) -> AuthResult<Option<PublicKey>> {
    let KeyMaterial::RsaPem { public_pem, .. } = keys else {
        return Ok(None);
    };

    let pem = String::from_utf8(public_pem.clone())
        .map_err(|_| AuthError::Configuration("RSA public key is not valid UTF-8".to_string()))?;

    let mut jwk = Jwk::from_encoding_key(encoding_key, algorithm.into()).map_err(|e| {
        AuthError::Configuration(format!("failed to derive JWK from RSA key: {e}"))
    })?;
    jwk.common.key_id = Some(RSA_KEY_ID.to_string());
    jwk.common.public_key_use = Some(PublicKeyUse::Signature);

    Ok(Some(PublicKey {
        pem,
        jwks: JwkSet { keys: vec![jwk] },
    }))
}

#[cfg(test)]
mod tests {
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    use super::*;

    const RSA_PRIVATE: &[u8] = include_bytes!("../../testdata/rsa_private.pem");
    const RSA_PUBLIC: &[u8] = include_bytes!("../../testdata/rsa_public.pem");
    const SECRET: &str = "test-secret-with-enough-entropy-0123456789";

    fn hs256() -> TokenSigner {
        TokenSigner::configure(
            "HS256",
            KeyMaterial::secret(SECRET),
            "authkeep",
            Duration::from_secs(900),
        )
        .expect("hs256 signer")
    }

    fn rs256() -> TokenSigner {
        TokenSigner::configure(
            "RS256",
            KeyMaterial::rsa_pem(RSA_PRIVATE, RSA_PUBLIC),
            "authkeep",
            Duration::from_secs(900),
        )
        .expect("rs256 signer")
    }

    fn flip_signature_bit(token: &str, bit: usize) -> String {
        let (signed, signature) = token.rsplit_once('.').expect("three segments");
        let mut bytes = URL_SAFE_NO_PAD.decode(signature).expect("signature base64");
        bytes[bit / 8] ^= 1 << (bit % 8);
        format!("{signed}.{}", URL_SAFE_NO_PAD.encode(bytes))
    }

    fn with_header(token: &str, header_json: &str) -> String {
        let (_, rest) = token.split_once('.').expect("three segments");
        format!("{}.{rest}", URL_SAFE_NO_PAD.encode(header_json))
    }

    #[test]
    fn test_issue_then_validate_returns_input() {
        for signer in [hs256(), rs256()] {
            let user_id = UserId::new();
            let token = signer.issue(user_id, "a@example.com", true).expect("issue");
            assert_eq!(token.split('.').count(), 3);

            let claims = signer.validate(&token).expect("validate");
            assert_eq!(claims.user_id, user_id);
            assert_eq!(claims.sub, user_id.to_string());
            assert_eq!(claims.email, "a@example.com");
            assert!(claims.email_verified);
            assert_eq!(claims.iss, "authkeep");
            assert_eq!(claims.exp - claims.iat, 900);
            assert_eq!(claims.nbf, claims.iat);
        }
    }

    #[test]
    fn test_rsa_header_carries_key_id() {
        let token = rs256().issue(UserId::new(), "a@example.com", false).unwrap();
        let header = decode_header(&token).unwrap();
        assert_eq!(header.alg, Algorithm::RS256);
        assert_eq!(header.kid.as_deref(), Some("default"));

        let token = hs256().issue(UserId::new(), "a@example.com", false).unwrap();
        assert!(decode_header(&token).unwrap().kid.is_none());
    }

    #[test]
    fn test_every_flipped_signature_bit_is_rejected() {
        let signer = hs256();
        let token = signer.issue(UserId::new(), "a@example.com", false).unwrap();

        for bit in 0..256 {
            let tampered = flip_signature_bit(&token, bit);
            let err = signer.validate(&tampered).unwrap_err();
            assert!(matches!(err, AuthError::InvalidSignature), "bit {bit}: {err:?}");
        }
    }

    #[test]
    fn test_flipped_rsa_signature_is_rejected() {
        let signer = rs256();
        let token = signer.issue(UserId::new(), "a@example.com", false).unwrap();
        let last_byte = 255 * 8;

        for bit in last_byte..last_byte + 8 {
            let tampered = flip_signature_bit(&token, bit);
            assert!(matches!(
                signer.validate(&tampered),
                Err(AuthError::InvalidSignature)
            ));
        }
    }

    #[test]
    fn test_expired_after_ttl() {
        let signer = hs256();
        let now = Utc::now().timestamp();
        let token = signer
            .issue_at(UserId::new(), "a@example.com", false, now)
            .unwrap();

        assert!(signer.validate_at(&token, now + 899).is_ok());
        assert!(matches!(
            signer.validate_at(&token, now + 900),
            Err(AuthError::ExpiredToken)
        ));
    }

    #[test]
    fn test_zero_ttl_is_immediately_expired() {
        let signer =
            TokenSigner::configure("HS256", KeyMaterial::secret(SECRET), "authkeep", Duration::ZERO)
                .unwrap();
        let token = signer.issue(UserId::new(), "a@example.com", false).unwrap();
        assert!(matches!(signer.validate(&token), Err(AuthError::ExpiredToken)));
    }

    #[test]
    fn test_not_yet_valid_is_rejected() {
        let signer = hs256();
        let now = Utc::now().timestamp();
        let token = signer
            .issue_at(UserId::new(), "a@example.com", false, now + 60)
            .unwrap();
        assert!(matches!(
            signer.validate_at(&token, now),
            Err(AuthError::ExpiredToken)
        ));
    }

    #[test]
    fn test_leeway_widens_window() {
        let signer = hs256().with_leeway(30);
        let now = Utc::now().timestamp();
        let token = signer
            .issue_at(UserId::new(), "a@example.com", false, now)
            .unwrap();

        assert!(signer.validate_at(&token, now + 920).is_ok());
        assert!(signer.validate_at(&token, now - 20).is_ok());
        assert!(matches!(
            signer.validate_at(&token, now + 930),
            Err(AuthError::ExpiredToken)
        ));
    }

    #[test]
    fn test_rsa_token_rejected_by_hmac_signer() {
        let token = rs256().issue(UserId::new(), "a@example.com", false).unwrap();
        assert!(matches!(
            hs256().validate(&token),
            Err(AuthError::WrongSigningMethod)
        ));
    }

    #[test]
    fn test_hmac_token_keyed_with_public_key_rejected_by_rsa_signer() {
        // Classic confusion: an HMAC token whose secret is the verifier's public key.
        let forger = TokenSigner::configure(
            "HS256",
            KeyMaterial::secret(RSA_PUBLIC),
            "authkeep",
            Duration::from_secs(900),
        )
        .unwrap();
        let forged = forger.issue(UserId::new(), "attacker@example.com", true).unwrap();

        assert!(matches!(
            rs256().validate(&forged),
            Err(AuthError::WrongSigningMethod)
        ));
    }

    #[test]
    fn test_same_family_other_size_rejected() {
        let hs512 = TokenSigner::configure(
            "HS512",
            KeyMaterial::secret(SECRET),
            "authkeep",
            Duration::from_secs(900),
        )
        .unwrap();
        let token = hs512.issue(UserId::new(), "a@example.com", false).unwrap();
        assert!(matches!(hs256().validate(&token), Err(AuthError::WrongSigningMethod)));
    }

    #[test]
    fn test_rewritten_header_fails_before_signature() {
        let signer = hs256();
        let token = signer.issue(UserId::new(), "a@example.com", false).unwrap();
        let tampered = with_header(&token, r#"{"alg":"RS256","typ":"JWT"}"#);
        assert!(matches!(
            signer.validate(&tampered),
            Err(AuthError::WrongSigningMethod)
        ));
    }

    #[test]
    fn test_alg_none_is_malformed() {
        let signer = hs256();
        let token = signer.issue(UserId::new(), "a@example.com", false).unwrap();
        let unsigned = with_header(&token, r#"{"alg":"none","typ":"JWT"}"#);
        assert!(matches!(
            signer.validate(&unsigned),
            Err(AuthError::MalformedToken)
        ));
    }

    #[test]
    fn test_garbage_is_malformed() {
        let signer = hs256();
        for token in ["", "abc", "not.a.token", "a.b"] {
            assert!(
                matches!(signer.validate(token), Err(AuthError::MalformedToken)),
                "{token}"
            );
        }
    }

    #[test]
    fn test_configuration_errors() {
        let ttl = Duration::from_secs(900);
        let cases = [
            TokenSigner::configure("ES256", KeyMaterial::secret(SECRET), "authkeep", ttl),
            TokenSigner::configure("none", KeyMaterial::secret(SECRET), "authkeep", ttl),
            TokenSigner::configure("HS256", KeyMaterial::secret(""), "authkeep", ttl),
            TokenSigner::configure("HS256", KeyMaterial::rsa_pem(RSA_PRIVATE, RSA_PUBLIC), "", ttl),
            TokenSigner::configure("RS256", KeyMaterial::secret(SECRET), "a", ttl),
            TokenSigner::configure("RS256", KeyMaterial::rsa_pem(RSA_PRIVATE, ""), "a", ttl),
            TokenSigner::configure("RS256", KeyMaterial::rsa_pem("junk", RSA_PUBLIC), "a", ttl),
        ];
        for (i, result) in cases.into_iter().enumerate() {
            assert!(
                matches!(result, Err(AuthError::Configuration(_))),
                "case {i}: {result:?}"
            );
        }
    }

    #[test]
    fn test_from_config() {
        let config = JwtConfig {
            secret: SECRET.to_string(),
            issuer: "issuer-x".to_string(),
            access_token_ttl_seconds: 60,
            leeway_seconds: 2,
            ..JwtConfig::default()
        };
        let signer = TokenSigner::from_config(&config).expect("signer");
        assert_eq!(signer.algorithm(), SigningAlgorithm::Hs256);
        assert_eq!(signer.issuer(), "issuer-x");
        assert_eq!(signer.ttl_seconds(), 60);

        let debug = format!("{signer:?}");
        assert!(!debug.contains(SECRET));
    }

    #[test]
    fn test_rsa_signer_publishes_verification_key() {
        let signer = rs256();
        let pem = signer.public_key_pem().expect("public pem");
        assert!(pem.contains("PUBLIC KEY"));

        let set = signer.jwks().expect("jwks");
        assert_eq!(set.keys.len(), 1);
        let jwk = set.find(RSA_KEY_ID).expect("default kid");
        assert_eq!(jwk.common.public_key_use, Some(PublicKeyUse::Signature));

        let json = serde_json::to_value(set).expect("serialize");
        assert_eq!(json["keys"][0]["kid"], "default");
        assert_eq!(json["keys"][0]["kty"], "RSA");
        assert!(json["keys"][0].get("d").is_none());

        let token = signer.issue(UserId::new(), "jwk@example.com", true).unwrap();
        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_aud = false;
        let key = DecodingKey::from_jwk(jwk).expect("decoding key");
        let data = decode::<Claims>(&token, &key, &validation).expect("verify with jwk");
        assert_eq!(data.claims.email, "jwk@example.com");
    }

    #[test]
    fn test_hmac_signer_exports_nothing() {
        let signer = hs256();
        assert!(signer.public_key_pem().is_none());
        assert!(signer.jwks().is_none());
    }
}
