//! Bearer token issuance and verification
//!
//! Tokens are HS256-signed JWTs. The signing key is built once from
//! configuration and never changes for the life of the process.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rollcall_core::AuthConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

/// JWT Claims structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Token issuer
    pub iss: String,
    /// Subject - user ID
    pub sub: String,
    /// JWT ID - unique token identifier used for revocation
    pub jti: String,
    /// Issued at timestamp (Unix epoch seconds)
    pub iat: u64,
    /// Expiration timestamp (Unix epoch seconds)
    pub exp: u64,
}

/// Token errors
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Failed to encode JWT: {0}")]
    EncodingError(#[source] jsonwebtoken::errors::Error),

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Token has expired")]
    Expired,

    #[error("System time error: {0}")]
    SystemTimeError(#[from] std::time::SystemTimeError),
}

/// A freshly minted token and the claims it carries
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
}

/// Claims of a token whose signature and expiry checked out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    pub subject: String,
    pub token_id: String,
    pub issued_at: u64,
    pub expires_at: u64,
}

impl VerifiedToken {
    /// Time left until expiry, zero once the token has lapsed
    pub fn remaining_lifetime(&self) -> Duration {
        let expires_at = UNIX_EPOCH + Duration::from_secs(self.expires_at);
        expires_at
            .duration_since(SystemTime::now())
            .unwrap_or(Duration::ZERO)
    }
}

/// Signs and verifies bearer tokens with a server-held secret
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    pub fn new(secret: &[u8], issuer: impl Into<String>) -> Self {
        let issuer = issuer.into();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&issuer]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        // Expiry is checked by `verify` after the signature, without leeway
        validation.validate_exp = false;
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            issuer,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(config.jwt_secret.as_bytes(), config.issuer.clone())
    }

    /// Mint a token for `subject` valid for `ttl`
    ///
    /// The token ID is a random UUIDv4 drawn from the OS CSPRNG.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use rollcall_api::auth::jwt::TokenCodec;
    /// use std::time::Duration;
    ///
    /// let codec = TokenCodec::new(b"secret", "rollcall");
    /// let issued = codec.issue("42", Duration::from_secs(3600)).unwrap();
    /// let verified = codec.verify(&issued.token).unwrap();
    /// assert_eq!(verified.subject, "42");
    /// ```
    pub fn issue(&self, subject: &str, ttl: Duration) -> Result<IssuedToken, TokenError> {
        let now = unix_now()?;

        let claims = Claims {
            iss: self.issuer.clone(),
            sub: subject.to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: now,
            exp: now.saturating_add(ttl.as_secs()),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(TokenError::EncodingError)?;

        Ok(IssuedToken { token, claims })
    }

    /// Check the signature, then the expiry
    ///
    /// Anything that fails before the expiry check (bad encoding, wrong
    /// algorithm, foreign issuer, tampered bytes) is `InvalidSignature`, so a
    /// tampered token never reports `Expired`. A token is valid while
    /// `now < exp`.
    pub fn verify(&self, token: &str) -> Result<VerifiedToken, TokenError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|_| TokenError::InvalidSignature)?;
        let claims = data.claims;

        if unix_now()? >= claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(VerifiedToken {
            subject: claims.sub,
            token_id: claims.jti,
            issued_at: claims.iat,
            expires_at: claims.exp,
        })
    }
}

fn unix_now() -> Result<u64, TokenError> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> TokenCodec {
        TokenCodec::new(b"test-secret-at-least-32-bytes-long!!", "rollcall")
    }

    fn encode_claims(claims: &Claims, secret: &[u8]) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret),
        )
        .unwrap()
    }

    #[test]
    fn test_issue_and_verify_token() {
        let codec = codec();
        let issued = codec.issue("1", Duration::from_secs(3600)).unwrap();

        let verified = codec.verify(&issued.token).expect("Failed to validate token");

        assert_eq!(verified.subject, "1");
        assert_eq!(verified.token_id, issued.claims.jti);
        assert_eq!(verified.expires_at, issued.claims.iat + 3600);
        assert!(verified.remaining_lifetime() > Duration::from_secs(3590));
    }

    #[test]
    fn test_token_ids_are_unique() {
        let codec = codec();
        let a = codec.issue("1", Duration::from_secs(60)).unwrap();
        let b = codec.issue("1", Duration::from_secs(60)).unwrap();
        assert_ne!(a.claims.jti, b.claims.jti);
        assert_ne!(a.token, b.token);
    }

    #[test]
    fn test_zero_ttl_is_expired() {
        let codec = codec();
        let issued = codec.issue("1", Duration::ZERO).unwrap();
        assert!(matches!(codec.verify(&issued.token), Err(TokenError::Expired)));
    }

    #[test]
    fn test_garbage_is_invalid_signature() {
        let codec = codec();
        assert!(matches!(
            codec.verify("invalid.token.here"),
            Err(TokenError::InvalidSignature)
        ));
        assert!(matches!(codec.verify(""), Err(TokenError::InvalidSignature)));
    }

    #[test]
    fn test_wrong_secret() {
        let issuer = TokenCodec::new(b"secret1", "rollcall");
        let verifier = TokenCodec::new(b"secret2", "rollcall");

        let issued = issuer.issue("1", Duration::from_secs(60)).unwrap();
        assert!(matches!(
            verifier.verify(&issued.token),
            Err(TokenError::InvalidSignature)
        ));
    }

    #[test]
    fn test_foreign_issuer_rejected() {
        let secret = b"shared-secret";
        let other = TokenCodec::new(secret, "someone-else");
        let ours = TokenCodec::new(secret, "rollcall");

        let issued = other.issue("1", Duration::from_secs(60)).unwrap();
        assert!(matches!(
            ours.verify(&issued.token),
            Err(TokenError::InvalidSignature)
        ));
    }

    #[test]
    fn test_expired_token() {
        let secret = b"test-secret-at-least-32-bytes-long!!";
        let now = unix_now().unwrap();

        // Create a token that expired 1 hour ago
        let claims = Claims {
            iss: "rollcall".to_string(),
            sub: "1".to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode_claims(&claims, secret);

        assert!(matches!(codec().verify(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn test_tampered_expired_token_reports_signature() {
        let now = unix_now().unwrap();
        let claims = Claims {
            iss: "rollcall".to_string(),
            sub: "1".to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode_claims(&claims, b"not-the-server-secret");

        assert!(matches!(
            codec().verify(&token),
            Err(TokenError::InvalidSignature)
        ));
    }

    #[test]
    fn test_unsigned_token_rejected() {
        // alg=none header with valid-looking claims and an empty signature
        let token = issued_with_none_alg();
        assert!(matches!(
            codec().verify(&token),
            Err(TokenError::InvalidSignature)
        ));
    }

    fn issued_with_none_alg() -> String {
        use base64::Engine;
        let engine = base64::engine::general_purpose::URL_SAFE_NO_PAD;
        let now = unix_now().unwrap();
        let header = engine.encode(r#"{"alg":"none","typ":"JWT"}"#);
        let payload = engine.encode(
            serde_json::to_string(&Claims {
                iss: "rollcall".to_string(),
                sub: "1".to_string(),
                jti: Uuid::new_v4().to_string(),
                iat: now,
                exp: now + 3600,
            })
            .unwrap(),
        );
        format!("{header}.{payload}.")
    }
}
