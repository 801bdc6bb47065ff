//! Authentication session manager
//!
//! Orchestrates login (credential check, token mint), logout (revocation
//! entry for the token's remaining lifetime) and per-request authorization
//! (signature, expiry, revocation). Holds no mutable state of its own; the
//! revocation store handle is the only shared resource.

use super::error::AuthError;
use super::jwt::{IssuedToken, TokenCodec, TokenError};
use super::models::{AuthenticatedIdentity, LogoutOutcome};
use super::password::{hash_password, verify_password};
use super::revocation::{RevocationStore, StoreError};
use rollcall_core::{AuthConfig, CredentialStore};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

/// Authentication service
pub struct AuthSessionManager {
    codec: TokenCodec,
    credentials: Arc<dyn CredentialStore>,
    revocations: Arc<dyn RevocationStore>,
    token_ttl: Duration,
    operation_timeout: Duration,
    /// Verified against when the username is unknown so both paths cost one bcrypt run
    dummy_hash: String,
}

impl AuthSessionManager {
    /// Create a new authentication service
    pub fn new(
        config: &AuthConfig,
        credentials: Arc<dyn CredentialStore>,
        revocations: Arc<dyn RevocationStore>,
    ) -> Result<Self, AuthError> {
        let dummy_hash = hash_password("rollcall-timing-equalizer", config.bcrypt_cost)
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        Ok(Self {
            codec: TokenCodec::from_config(config),
            credentials,
            revocations,
            token_ttl: Duration::from_secs(config.token_ttl_secs),
            operation_timeout: Duration::from_millis(config.operation_timeout_ms),
            dummy_hash,
        })
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Name of the configured revocation backend
    pub fn store_name(&self) -> &str {
        self.revocations.name()
    }

    /// Login with username and password
    ///
    /// # Returns
    ///
    /// * `Ok(IssuedToken)` - Signed token valid for the configured TTL
    /// * `Err(AuthError::InvalidCredentials)` - Unknown user, wrong password or disabled account
    /// * `Err(AuthError::AuthUnavailable)` - Credential lookup or hashing failed or timed out
    pub async fn login(&self, username: &str, password: &str) -> Result<IssuedToken, AuthError> {
        let credential = timeout(
            self.operation_timeout,
            self.credentials.find_by_username(username),
        )
        .await
        .map_err(|_| AuthError::AuthUnavailable("credential lookup timed out".to_string()))?
        .map_err(|e| AuthError::AuthUnavailable(e.to_string()))?;

        let Some(credential) = credential else {
            self.verify_password_bounded(password, &self.dummy_hash)
                .await?;
            tracing::debug!(username, "Login for unknown user");
            return Err(AuthError::InvalidCredentials);
        };

        let matched = self
            .verify_password_bounded(password, &credential.password_hash)
            .await?;

        if !matched || !credential.enabled {
            tracing::debug!(username, enabled = credential.enabled, "Login rejected");
            return Err(AuthError::InvalidCredentials);
        }

        let issued = self.codec.issue(&credential.subject_id, self.token_ttl)?;
        tracing::debug!(subject = %issued.claims.sub, jti = %issued.claims.jti, "Token issued");

        Ok(issued)
    }

    /// Logout by revoking the token for the rest of its lifetime
    ///
    /// A token that no longer verifies cannot be used anyway, so it is
    /// reported as [`LogoutOutcome::AlreadyInvalid`] rather than an error.
    pub async fn logout(&self, token: &str) -> Result<LogoutOutcome, AuthError> {
        let verified = match self.codec.verify(token) {
            Ok(verified) => verified,
            Err(TokenError::InvalidSignature | TokenError::Expired) => {
                return Ok(LogoutOutcome::AlreadyInvalid);
            }
            Err(e) => return Err(e.into()),
        };

        let remaining = verified.remaining_lifetime();
        self.bounded(self.revocations.revoke(&verified.token_id, remaining))
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, store = self.store_name(), "Revocation write failed");
                AuthError::AuthUnavailable(e.to_string())
            })?;

        tracing::debug!(
            jti = %verified.token_id,
            remaining_ms = remaining.as_millis() as u64,
            "Token revoked"
        );

        Ok(LogoutOutcome::Revoked {
            token_id: verified.token_id,
            subject: verified.subject,
        })
    }

    /// Validate a bearer token for one request
    ///
    /// Signature and expiry are checked locally first; the revocation store
    /// is consulted only for tokens that pass. A store error or timeout
    /// denies access.
    pub async fn authorize(&self, token: &str) -> Result<AuthenticatedIdentity, AuthError> {
        let verified = self.codec.verify(token)?;

        let revoked = self
            .bounded(self.revocations.is_revoked(&verified.token_id))
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, store = self.store_name(), "Revocation check failed");
                AuthError::AuthUnavailable(e.to_string())
            })?;

        if revoked {
            return Err(AuthError::TokenRevoked);
        }

        Ok(AuthenticatedIdentity {
            subject: verified.subject,
            token_id: verified.token_id,
            expires_at: verified.expires_at,
        })
    }

    /// Whether the revocation store answers within the deadline
    pub async fn store_ready(&self) -> bool {
        self.bounded(self.revocations.ping()).await.is_ok()
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        timeout(self.operation_timeout, call)
            .await
            .map_err(|_| StoreError::Timeout(self.operation_timeout))?
    }

    /// bcrypt on the blocking pool, bounded by the operation deadline
    async fn verify_password_bounded(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let password = password.to_string();
        let hash = hash.to_string();
        let task = tokio::task::spawn_blocking(move || verify_password(&password, &hash));

        match timeout(self.operation_timeout, task).await {
            Ok(Ok(matched)) => Ok(matched),
            Ok(Err(e)) => Err(AuthError::Internal(format!("password task failed: {e}"))),
            Err(_) => Err(AuthError::AuthUnavailable(
                "password verification timed out".to_string(),
            )),
        }
    }
}
