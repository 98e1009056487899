//! API key format, minting, and rate-limited timing-uniform verification.
//!
//! Keys look like `sk_live_<40 alphanumeric chars>`. The plaintext is shown
//! to the holder exactly once at mint time; storage keeps the first 12 chars
//! (`key_prefix`, the lookup handle) and a salted digest. Verification loads
//! every non-revoked record sharing the presented prefix and digest-checks
//! all of them, never short-circuiting, so response latency does not reveal
//! whether a prefix exists or which candidate matched.

use std::sync::Arc;

use chrono::Utc;
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use tracing::{debug, warn};

use super::config::AuthConfig;
use super::rate_limit::RateLimiter;
use super::store::AuthStore;
use super::{AuthError, digest};
use crate::models::auth::{ApiKeyRecord, User};
use crate::uuid::uuidv7;

/// Literal prefix carried by every API key.
pub const API_KEY_PREFIX: &str = "sk_live_";

/// Random payload length of a generated key.
pub const API_KEY_PAYLOAD_LEN: usize = 40;

/// Cheap length gate applied before any rate-limited or cryptographic work.
pub const MIN_API_KEY_LEN: usize = API_KEY_PREFIX.len() + 32;

/// Stored lookup prefix: the first 12 chars of the full key.
pub const KEY_PREFIX_LEN: usize = 12;

/// Quick shape check used by the middleware to dispatch bearer credentials.
pub fn looks_like_api_key(credential: &str) -> bool {
    credential.starts_with(API_KEY_PREFIX)
}

/// Generate a fresh plaintext API key.
pub fn generate_api_key() -> String {
    let payload: String = rng()
        .sample_iter(&Alphanumeric)
        .take(API_KEY_PAYLOAD_LEN)
        .map(char::from)
        .collect();
    format!("{API_KEY_PREFIX}{payload}")
}

/// Mint a key for a user: returns the plaintext (show once) and the record.
pub async fn mint_api_key(
    store: &dyn AuthStore,
    user_id: &str,
    permissions: Vec<String>,
    expires_at: Option<chrono::DateTime<chrono::Utc>>,
) -> Result<(String, ApiKeyRecord), AuthError> {
    let plaintext = generate_api_key();
    let record = ApiKeyRecord {
        id: uuidv7(),
        user_id: user_id.to_string(),
        key_prefix: plaintext[..KEY_PREFIX_LEN].to_string(),
        key_hash: digest::digest_secret(&plaintext)?,
        permissions,
        expires_at,
        revoked_at: None,
        last_used_at: None,
    };
    store.insert_api_key(record.clone()).await?;
    Ok((plaintext, record))
}

/// A successfully verified key: the owning user plus the key's scope set.
#[derive(Debug, Clone)]
pub struct ApiKeyAuth {
    pub user: User,
    pub permissions: Vec<String>,
}

/// Rate-limited API key verifier.
#[derive(Clone)]
pub struct ApiKeyAuthenticator {
    limiter: Arc<RateLimiter>,
    enabled: bool,
}

impl ApiKeyAuthenticator {
    /// Build from validated config; shares the process-wide limiter.
    pub fn new(config: &AuthConfig, limiter: Arc<RateLimiter>) -> Self {
        Self {
            enabled: config.api_keys_enabled(),
            limiter,
        }
    }

    /// Whether key-based auth is available at all (see `AuthConfig`).
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Verify a presented key.
    ///
    /// Rejections are deliberately indistinguishable to the caller: bad
    /// format, unknown prefix, wrong key, expired record, and disabled
    /// capability all surface as `CredentialError`. The distinct reason only
    /// reaches server logs.
    pub async fn authenticate(
        &self,
        store: &dyn AuthStore,
        raw_key: &str,
        client_ip: &str,
    ) -> Result<ApiKeyAuth, AuthError> {
        if !raw_key.starts_with(API_KEY_PREFIX) || raw_key.len() < MIN_API_KEY_LEN {
            return Err(AuthError::CredentialError);
        }
        let Some(key_prefix) = raw_key.get(..KEY_PREFIX_LEN) else {
            return Err(AuthError::CredentialError);
        };

        if !self.enabled {
            debug!("API key auth attempted while disabled");
            return Err(AuthError::CredentialError);
        }

        // Both limiter keys must allow; evaluate both so the counters stay
        // consistent even when one of them denies.
        let ip_key = format!("ip:{client_ip}");
        let prefix_key = format!("prefix:{key_prefix}");
        let ip_allowed = self.limiter.allow(&ip_key);
        let prefix_allowed = self.limiter.allow(&prefix_key);
        if !ip_allowed || !prefix_allowed {
            warn!(client_ip, key_prefix, "API key attempt rate limited");
            return Err(AuthError::RateLimited);
        }

        let candidates = store.api_keys_by_prefix(key_prefix).await?;
        if candidates.is_empty() {
            // Unknown prefix burns the same verify work as a wrong key.
            digest::timing_pad_verify(raw_key);
            debug!(key_prefix, "API key prefix unknown");
            return Err(AuthError::CredentialError);
        }

        // Check every candidate; no short-circuit on the first match.
        let mut matched: Option<&ApiKeyRecord> = None;
        for record in &candidates {
            if digest::verify_secret(raw_key, &record.key_hash)? && matched.is_none() {
                matched = Some(record);
            }
        }
        let Some(record) = matched else {
            debug!(key_prefix, "API key digest mismatch");
            return Err(AuthError::CredentialError);
        };

        if record
            .expires_at
            .is_some_and(|expires_at| expires_at <= Utc::now())
        {
            debug!(key_id = %record.id, "API key expired");
            return Err(AuthError::CredentialError);
        }

        let Some(user) = store.find_user_by_id(&record.user_id).await? else {
            debug!(key_id = %record.id, "API key owner missing");
            return Err(AuthError::CredentialError);
        };
        if !user.is_active {
            debug!(key_id = %record.id, "API key owner suspended");
            return Err(AuthError::Suspended);
        }

        self.limiter.reset(&ip_key);
        self.limiter.reset(&prefix_key);
        store.touch_api_key(&record.id).await?;

        Ok(ApiKeyAuth {
            user,
            permissions: record.permissions.clone(),
        })
    }
}
