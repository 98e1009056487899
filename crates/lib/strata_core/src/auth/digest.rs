//! Salted digests for stored secrets (refresh tokens, API keys).
//!
//! Secrets are SHA-256 pre-hashed before bcrypt. bcrypt only considers the
//! first 72 bytes of its input; refresh tokens are JWTs whose header and
//! payload prefix are shared across a family, so without the pre-hash two
//! distinct tokens could digest-compare equal.

use std::sync::OnceLock;

use sha2::{Digest, Sha256};

use super::AuthError;
use super::password;

static TIMING_PAD_DIGEST: OnceLock<String> = OnceLock::new();

/// SHA-256 hex of a secret, the fixed-length bcrypt input.
fn prehash(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Produce a salted digest of a secret for storage.
pub fn digest_secret(secret: &str) -> Result<String, AuthError> {
    password::hash_password(&prehash(secret))
}

/// Verify a secret against a stored digest.
pub fn verify_secret(secret: &str, digest: &str) -> Result<bool, AuthError> {
    password::verify_password(&prehash(secret), digest)
}

/// Burn one verify's worth of work without a real candidate digest.
///
/// Lookups that find zero candidates call this so that "prefix unknown" and
/// "prefix known but key wrong" take statistically similar time.
pub fn timing_pad_verify(secret: &str) {
    let pad = TIMING_PAD_DIGEST
        .get_or_init(|| password::hash_password("timing-pad").unwrap_or_default());
    let _ = password::verify_password(&prehash(secret), pad);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_and_verify_roundtrip() {
        let digest = digest_secret("some-long-opaque-secret").unwrap();
        assert!(verify_secret("some-long-opaque-secret", &digest).unwrap());
        assert!(!verify_secret("some-other-secret", &digest).unwrap());
    }

    #[test]
    fn digests_are_salted() {
        let a = digest_secret("secret").unwrap();
        let b = digest_secret("secret").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn long_inputs_differing_past_72_bytes_do_not_collide() {
        let head = "x".repeat(100);
        let a = format!("{head}AAAA");
        let b = format!("{head}BBBB");
        let digest = digest_secret(&a).unwrap();
        assert!(!verify_secret(&b, &digest).unwrap());
    }

    #[test]
    fn timing_pad_does_not_panic() {
        timing_pad_verify("sk_live_whatever");
    }
}
