//! The credential-hashing capability: bcrypt, salted per call.
//!
//! Passwords and the stored digests of refresh tokens and API keys all go
//! through this pair. Equality of secrets is only observable through
//! [`verify_password`]; digests of the same input never compare equal.

use super::AuthError;

/// bcrypt work factor.
const BCRYPT_COST: u32 = 10;

/// Produce a salted digest of a secret.
pub fn hash_password(secret: &str) -> Result<String, AuthError> {
    bcrypt::hash(secret, BCRYPT_COST).map_err(|e| AuthError::Internal(format!("hash: {e}")))
}

/// Check a secret against a stored digest.
pub fn verify_password(secret: &str, digest: &str) -> Result<bool, AuthError> {
    bcrypt::verify(secret, digest).map_err(|e| AuthError::Internal(format!("verify: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let hash = hash_password("hunter2!").unwrap();
        assert!(verify_password("hunter2!", &hash).unwrap());
        assert!(!verify_password("hunter3!", &hash).unwrap());
    }

    #[test]
    fn hashes_are_salted() {
        let a = hash_password("same-password").unwrap();
        let b = hash_password("same-password").unwrap();
        assert_ne!(a, b);
    }
}
