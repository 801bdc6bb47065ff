/// Password hashing and verification using bcrypt
///
/// Digests are salted per call and carry their own cost factor, so a
/// digest produced at any accepted cost verifies without extra parameters.
/// bcrypt compares digests in constant time.
use rollcall_core::config::{MAX_BCRYPT_COST, MIN_BCRYPT_COST};
use thiserror::Error;

/// Password hashing errors
#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("bcrypt cost must be between {MIN_BCRYPT_COST} and {MAX_BCRYPT_COST}, got {cost}")]
    InvalidCostFactor { cost: u32 },

    #[error("Failed to hash password: {0}")]
    HashingFailed(String),
}

/// Hash a plaintext password with bcrypt
///
/// # Arguments
///
/// * `password` - The plaintext password to hash
/// * `cost` - bcrypt work factor, `4..=31`
///
/// # Returns
///
/// * `Ok(String)` - Modular crypt format digest (`$2b$<cost>$<salt><hash>`)
/// * `Err(PasswordError::InvalidCostFactor)` - If `cost` is out of range
///
/// # Example
///
/// ```no_run
/// use rollcall_api::auth::password::{hash_password, verify_password};
///
/// let hash = hash_password("admin1234", 10).expect("Failed to hash password");
/// assert!(verify_password("admin1234", &hash));
/// ```
pub fn hash_password(password: &str, cost: u32) -> Result<String, PasswordError> {
    check_cost(cost)?;

    bcrypt::hash(password, cost).map_err(|e| PasswordError::HashingFailed(e.to_string()))
}

/// Accept only cost factors bcrypt supports
pub fn check_cost(cost: u32) -> Result<(), PasswordError> {
    if (MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&cost) {
        Ok(())
    } else {
        Err(PasswordError::InvalidCostFactor { cost })
    }
}

/// Verify a plaintext password against a stored digest
///
/// A mismatch is an ordinary outcome, so this never errors: malformed
/// digests, an empty password and an empty digest all yield `false`.
pub fn verify_password(password: &str, hash: &str) -> bool {
    if password.is_empty() || hash.is_empty() {
        return false;
    }

    bcrypt::verify(password, hash).unwrap_or(false)
}
